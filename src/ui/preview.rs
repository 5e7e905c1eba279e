//! Quarto preview panel
//!
//! The panel holds a browser frame pointed at the preview server. egui has
//! no embedded web engine, so the frame is drawn as its source address with
//! a link that opens it in the system browser.

use std::any::Any;

use eframe::egui;

use crate::workbench::{LeafId, View, Workbench, WorkbenchError};

/// Type tag the preview panel is registered under
pub const VIEW_TYPE_QUARTO_PREVIEW: &str = "quarto-preview-view";

/// Capabilities granted to the framed content
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SandboxPermission {
    Scripts,
    Forms,
    SameOrigin,
    Popups,
}

impl SandboxPermission {
    pub fn token(self) -> &'static str {
        match self {
            SandboxPermission::Scripts => "allow-scripts",
            SandboxPermission::Forms => "allow-forms",
            SandboxPermission::SameOrigin => "allow-same-origin",
            SandboxPermission::Popups => "allow-popups",
        }
    }
}

/// What rendered quarto output needs for its own interactivity and search
pub const PREVIEW_SANDBOX: [SandboxPermission; 4] = [
    SandboxPermission::Scripts,
    SandboxPermission::Forms,
    SandboxPermission::SameOrigin,
    SandboxPermission::Popups,
];

/// Sandboxed frame showing one URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrowserFrame {
    src: Option<String>,
    sandbox: Vec<SandboxPermission>,
}

impl BrowserFrame {
    pub fn new(sandbox: &[SandboxPermission]) -> Self {
        Self {
            src: None,
            sandbox: sandbox.to_vec(),
        }
    }

    pub fn src(&self) -> Option<&str> {
        self.src.as_deref()
    }

    pub fn set_src(&mut self, src: &str) {
        self.src = Some(src.to_string());
    }

    /// Space separated sandbox attribute value
    pub fn sandbox_attribute(&self) -> String {
        self.sandbox
            .iter()
            .map(|p| p.token())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Side panel showing the running preview
pub struct QuartoPreviewView {
    url: Option<String>,
    frame: Option<BrowserFrame>,
}

impl Default for QuartoPreviewView {
    fn default() -> Self {
        Self::new()
    }
}

impl QuartoPreviewView {
    pub fn new() -> Self {
        Self {
            url: None,
            frame: None,
        }
    }

    /// Point the panel at `url`; applied on open if the frame does not exist yet
    pub fn set_url(&mut self, url: &str) {
        self.url = Some(url.to_string());
        if let Some(frame) = self.frame.as_mut() {
            frame.set_src(url);
        }
    }

    #[allow(dead_code)]
    pub fn frame(&self) -> Option<&BrowserFrame> {
        self.frame.as_ref()
    }
}

impl View for QuartoPreviewView {
    fn view_type(&self) -> &'static str {
        VIEW_TYPE_QUARTO_PREVIEW
    }

    fn display_text(&self) -> &str {
        "Quarto Preview"
    }

    fn on_open(&mut self) {
        let mut frame = BrowserFrame::new(&PREVIEW_SANDBOX);
        if let Some(url) = self.url.as_deref() {
            frame.set_src(url);
        }
        self.frame = Some(frame);
    }

    fn on_close(&mut self) {
        self.frame = None;
    }

    fn ui(&mut self, ui: &mut egui::Ui) {
        let Some(frame) = self.frame.as_ref() else {
            return;
        };

        match frame.src() {
            Some(src) => {
                ui.horizontal(|ui| {
                    ui.label("Serving at");
                    ui.hyperlink_to(src, src);
                });
                ui.add_space(8.0);
                if ui.button("Open in browser").clicked() {
                    if let Err(e) = open::that(src) {
                        tracing::error!("Failed to open {}: {}", src, e);
                    }
                }
                ui.add_space(8.0);
                ui.weak(format!("sandbox: {}", frame.sandbox_attribute()));
            }
            None => {
                ui.vertical_centered(|ui| {
                    ui.add_space(50.0);
                    ui.label("Waiting for the preview server...");
                });
            }
        }
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Register the preview panel with the workbench
pub fn register(workbench: &mut Workbench) {
    workbench.register_view(
        VIEW_TYPE_QUARTO_PREVIEW,
        Box::new(|| Box::new(QuartoPreviewView::new()) as Box<dyn View>),
    );
}

/// Show `url` in the preview panel, creating the panel only if none exists.
///
/// A new panel goes to the right dock, or to a new main leaf when the dock
/// is unavailable.
pub fn activate_preview(workbench: &mut Workbench, url: &str) -> Result<LeafId, WorkbenchError> {
    let leaf = match workbench.leaves_of_type(VIEW_TYPE_QUARTO_PREVIEW).first() {
        Some(leaf) => *leaf,
        None => {
            let leaf = match workbench.right_leaf() {
                Some(leaf) => leaf,
                None => workbench.new_main_leaf(),
            };
            workbench.set_view_state(leaf, VIEW_TYPE_QUARTO_PREVIEW)?;
            leaf
        }
    };

    workbench.reveal(leaf);
    if let Some(view) = workbench.view_mut::<QuartoPreviewView>(leaf) {
        view.set_url(url);
    }
    Ok(leaf)
}
