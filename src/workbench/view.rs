//! View trait implemented by every panel hosted in a workbench leaf

use std::any::Any;

use eframe::egui;

/// A panel that can live inside a [`super::Leaf`]
pub trait View: Any {
    /// Type tag the view was registered under
    fn view_type(&self) -> &'static str;

    /// Title shown on the leaf's tab
    fn display_text(&self) -> &str;

    /// Called once after the view is placed in a leaf
    fn on_open(&mut self) {}

    /// Called when the leaf is closed
    fn on_close(&mut self) {}

    /// Draw the view
    fn ui(&mut self, ui: &mut egui::Ui);

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Constructor registered for a view type
pub type ViewFactory = Box<dyn Fn() -> Box<dyn View>>;
