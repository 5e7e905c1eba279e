//! Transient user notices

use std::time::{Duration, Instant};

use eframe::egui;

const DEFAULT_LIFETIME: Duration = Duration::from_secs(4);

#[derive(Debug, Clone)]
pub struct Notice {
    pub message: String,
    expires_at: Instant,
}

/// Queue of toasts drawn over the workspace
#[derive(Debug, Default)]
pub struct Notices {
    active: Vec<Notice>,
}

impl Notices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Show `message` for the default lifetime
    pub fn show(&mut self, message: impl Into<String>) {
        self.show_for(message, DEFAULT_LIFETIME);
    }

    pub fn show_for(&mut self, message: impl Into<String>, lifetime: Duration) {
        let message = message.into();
        tracing::info!("Notice: {}", message);
        self.active.push(Notice {
            message,
            expires_at: Instant::now() + lifetime,
        });
    }

    /// Drop notices whose lifetime has passed
    pub fn prune(&mut self, now: Instant) {
        self.active.retain(|n| n.expires_at > now);
    }

    #[allow(dead_code)]
    pub fn messages(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(|n| n.message.as_str())
    }

    #[allow(dead_code)]
    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Draw the active notices in the bottom-right corner
    pub fn ui(&mut self, ctx: &egui::Context) {
        self.prune(Instant::now());
        if self.active.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notices"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
            .order(egui::Order::Foreground)
            .show(ctx, |ui| {
                for notice in &self.active {
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(&notice.message);
                    });
                }
            });

        // Keep repainting so notices disappear on time
        ctx.request_repaint_after(Duration::from_millis(250));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expired_notices_are_pruned() {
        let mut notices = Notices::new();
        notices.show_for("short", Duration::from_millis(10));
        notices.show("long");

        notices.prune(Instant::now() + Duration::from_secs(1));
        assert_eq!(notices.messages().collect::<Vec<_>>(), vec!["long"]);

        notices.prune(Instant::now() + Duration::from_secs(10));
        assert!(notices.is_empty());
    }
}
