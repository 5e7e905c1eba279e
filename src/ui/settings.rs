//! Settings window

use eframe::egui;

use crate::core::config::AppConfig;

/// Settings form; every edit is saved immediately
#[derive(Debug, Default)]
pub struct SettingsWindow {
    pub visible: bool,
}

impl SettingsWindow {
    /// Draw the window. Returns true when a setting changed.
    pub fn show(&mut self, ctx: &egui::Context, config: &mut AppConfig) -> bool {
        if !self.visible {
            return false;
        }

        let mut changed = false;
        let mut open = true;
        egui::Window::new("Settings")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                ui.heading("Quarto");
                ui.add_space(4.0);
                ui.label("Quarto binary path");
                ui.weak("Path to the quarto executable. Leave as \"quarto\" if it is in your system PATH.");
                let response = ui.add(
                    egui::TextEdit::singleline(&mut config.quarto.binary)
                        .hint_text("quarto")
                        .desired_width(320.0),
                );
                if response.changed() {
                    changed = true;
                }
            });

        if !open {
            self.visible = false;
        }
        if changed {
            if let Err(e) = config.save() {
                tracing::error!("Failed to save settings: {}", e);
            }
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_frame(window: &mut SettingsWindow, config: &mut AppConfig) -> bool {
        let ctx = egui::Context::default();
        let mut changed = false;
        let _ = ctx.run(egui::RawInput::default(), |ctx| {
            changed = window.show(ctx, config);
        });
        changed
    }

    #[test]
    fn test_untouched_form_reports_no_change() {
        let mut config = AppConfig::default();

        let mut window = SettingsWindow::default();
        assert!(!run_frame(&mut window, &mut config));

        window.visible = true;
        assert!(!run_frame(&mut window, &mut config));
        assert!(window.visible);
        assert_eq!(config.quarto.binary(), "quarto");
    }
}
