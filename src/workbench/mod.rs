//! Leaf/pane layout hosting registered views
//!
//! Views are constructed through factories registered once per type tag.
//! Callers look up existing leaves by tag before creating a new one, which
//! is how single-instance panels are kept unique.

pub mod notice;
pub mod view;

use std::collections::HashMap;

use eframe::egui;

pub use notice::Notices;
pub use view::{View, ViewFactory};

#[derive(Debug, thiserror::Error)]
pub enum WorkbenchError {
    #[error("no view registered for type `{0}`")]
    UnknownViewType(String),

    #[error("leaf {0:?} does not exist")]
    NoSuchLeaf(LeafId),
}

/// Where a leaf is docked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dock {
    Main,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeafId(u64);

/// A pane that holds at most one view
pub struct Leaf {
    pub id: LeafId,
    pub dock: Dock,
    view: Option<Box<dyn View>>,
}

impl Leaf {
    pub fn view_type(&self) -> Option<&'static str> {
        self.view.as_ref().map(|v| v.view_type())
    }

    fn title(&self) -> &str {
        self.view.as_ref().map(|v| v.display_text()).unwrap_or("Empty")
    }
}

/// Workspace layout: a main area and a right side dock
pub struct Workbench {
    factories: HashMap<&'static str, ViewFactory>,
    leaves: Vec<Leaf>,
    next_id: u64,
    /// Leaf currently shown in the main area, `None` for the home page
    active_main: Option<LeafId>,
    active_right: Option<LeafId>,
    /// The user can turn the side dock off entirely
    pub right_dock_enabled: bool,
    pub right_dock_collapsed: bool,
}

impl Default for Workbench {
    fn default() -> Self {
        Self::new()
    }
}

impl Workbench {
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
            leaves: Vec::new(),
            next_id: 0,
            active_main: None,
            active_right: None,
            right_dock_enabled: true,
            right_dock_collapsed: false,
        }
    }

    /// Register the constructor for a view type
    pub fn register_view(&mut self, view_type: &'static str, factory: ViewFactory) {
        if self.factories.insert(view_type, factory).is_some() {
            tracing::warn!("View type {} registered twice", view_type);
        }
    }

    /// Leaves currently showing a view of `view_type`
    pub fn leaves_of_type(&self, view_type: &str) -> Vec<LeafId> {
        self.leaves
            .iter()
            .filter(|leaf| leaf.view_type() == Some(view_type))
            .map(|leaf| leaf.id)
            .collect()
    }

    /// An empty leaf in the right dock, or `None` when the dock is disabled
    pub fn right_leaf(&mut self) -> Option<LeafId> {
        if !self.right_dock_enabled {
            return None;
        }
        if let Some(leaf) = self
            .leaves
            .iter()
            .find(|leaf| leaf.dock == Dock::Right && leaf.view.is_none())
        {
            return Some(leaf.id);
        }
        Some(self.push_leaf(Dock::Right))
    }

    /// A new leaf in the main area
    pub fn new_main_leaf(&mut self) -> LeafId {
        self.push_leaf(Dock::Main)
    }

    fn push_leaf(&mut self, dock: Dock) -> LeafId {
        self.next_id += 1;
        let id = LeafId(self.next_id);
        self.leaves.push(Leaf {
            id,
            dock,
            view: None,
        });
        id
    }

    /// Construct a view of `view_type` inside `leaf`, replacing its content
    pub fn set_view_state(&mut self, leaf: LeafId, view_type: &str) -> Result<(), WorkbenchError> {
        let factory = self
            .factories
            .get(view_type)
            .ok_or_else(|| WorkbenchError::UnknownViewType(view_type.to_string()))?;
        let slot = self
            .leaves
            .iter_mut()
            .find(|l| l.id == leaf)
            .ok_or(WorkbenchError::NoSuchLeaf(leaf))?;

        if let Some(mut old) = slot.view.take() {
            old.on_close();
        }
        let mut view = factory();
        view.on_open();
        slot.view = Some(view);
        tracing::debug!(?leaf, "Opened view {}", view_type);
        Ok(())
    }

    /// Bring `leaf` to the front, expanding the side dock if needed
    pub fn reveal(&mut self, leaf: LeafId) {
        let Some(dock) = self.leaf(leaf).map(|l| l.dock) else {
            return;
        };
        match dock {
            Dock::Main => self.active_main = Some(leaf),
            Dock::Right => {
                self.active_right = Some(leaf);
                self.right_dock_collapsed = false;
            }
        }
    }

    #[allow(dead_code)]
    pub fn is_revealed(&self, leaf: LeafId) -> bool {
        match self.leaf(leaf).map(|l| l.dock) {
            Some(Dock::Main) => self.active_main == Some(leaf),
            Some(Dock::Right) => self.active_right == Some(leaf) && !self.right_dock_collapsed,
            None => false,
        }
    }

    pub fn leaf(&self, leaf: LeafId) -> Option<&Leaf> {
        self.leaves.iter().find(|l| l.id == leaf)
    }

    /// Downcast the view held by `leaf`
    pub fn view_mut<T: View>(&mut self, leaf: LeafId) -> Option<&mut T> {
        self.leaves
            .iter_mut()
            .find(|l| l.id == leaf)
            .and_then(|l| l.view.as_mut())
            .and_then(|v| v.as_any_mut().downcast_mut::<T>())
    }

    /// Remove a leaf, closing its view
    pub fn detach(&mut self, leaf: LeafId) {
        if let Some(index) = self.leaves.iter().position(|l| l.id == leaf) {
            let mut removed = self.leaves.remove(index);
            if let Some(view) = removed.view.as_mut() {
                view.on_close();
            }
        }
        if self.active_main == Some(leaf) {
            self.active_main = None;
        }
        if self.active_right == Some(leaf) {
            self.active_right = None;
        }
    }

    fn leaves_in(&self, dock: Dock) -> Vec<(LeafId, String)> {
        self.leaves
            .iter()
            .filter(|l| l.dock == dock)
            .map(|l| (l.id, l.title().to_string()))
            .collect()
    }

    /// Draw the right dock as a side panel
    pub fn show_right_dock(&mut self, ctx: &egui::Context) {
        if !self.right_dock_enabled || self.right_dock_collapsed {
            return;
        }
        let tabs = self.leaves_in(Dock::Right);
        if tabs.is_empty() {
            return;
        }
        if self.active_right.is_none() {
            self.active_right = tabs.first().map(|(id, _)| *id);
        }

        egui::SidePanel::right("right_dock")
            .resizable(true)
            .default_width(480.0)
            .min_width(200.0)
            .show(ctx, |ui| {
                let mut close = None;
                ui.horizontal(|ui| {
                    for (id, title) in &tabs {
                        if ui
                            .selectable_label(self.active_right == Some(*id), title)
                            .clicked()
                        {
                            self.active_right = Some(*id);
                        }
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        if ui.button("\u{2715}").on_hover_text("Close").clicked() {
                            close = self.active_right;
                        }
                        if ui.button("\u{25B6}").on_hover_text("Collapse").clicked() {
                            self.right_dock_collapsed = true;
                        }
                    });
                });
                ui.separator();
                if let Some(active) = self.active_right {
                    self.show_leaf(ui, active);
                }
                if let Some(leaf) = close {
                    self.detach(leaf);
                }
            });
    }

    /// Draw the main area tab strip. Returns the active main leaf after
    /// drawing the tabs; the caller draws the home page when it is `None`.
    pub fn show_main_tabs(&mut self, ui: &mut egui::Ui) -> Option<LeafId> {
        let tabs = self.leaves_in(Dock::Main);
        if tabs.is_empty() {
            return None;
        }

        let mut close = None;
        ui.horizontal(|ui| {
            if ui.selectable_label(self.active_main.is_none(), "Home").clicked() {
                self.active_main = None;
            }
            for (id, title) in &tabs {
                if ui
                    .selectable_label(self.active_main == Some(*id), title)
                    .clicked()
                {
                    self.active_main = Some(*id);
                }
                if self.active_main == Some(*id) && ui.small_button("\u{2715}").clicked() {
                    close = Some(*id);
                }
            }
        });
        ui.separator();
        if let Some(leaf) = close {
            self.detach(leaf);
        }
        self.active_main
    }

    /// Draw the view held by `leaf`
    pub fn show_leaf(&mut self, ui: &mut egui::Ui, leaf: LeafId) {
        if let Some(view) = self
            .leaves
            .iter_mut()
            .find(|l| l.id == leaf)
            .and_then(|l| l.view.as_mut())
        {
            view.ui(ui);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Counter {
        opened: u32,
    }

    impl View for Counter {
        fn view_type(&self) -> &'static str {
            "counter"
        }

        fn display_text(&self) -> &str {
            "Counter"
        }

        fn on_open(&mut self) {
            self.opened += 1;
        }

        fn ui(&mut self, _ui: &mut egui::Ui) {}

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn workbench() -> Workbench {
        let mut workbench = Workbench::new();
        workbench.register_view(
            "counter",
            Box::new(|| Box::new(Counter { opened: 0 }) as Box<dyn View>),
        );
        workbench
    }

    #[test]
    fn test_set_view_state_constructs_and_opens() {
        let mut workbench = workbench();
        let leaf = workbench.right_leaf().unwrap();
        workbench.set_view_state(leaf, "counter").unwrap();

        assert_eq!(workbench.leaves_of_type("counter"), vec![leaf]);
        assert_eq!(workbench.view_mut::<Counter>(leaf).unwrap().opened, 1);
        assert_eq!(workbench.leaf(leaf).unwrap().dock, Dock::Right);
    }

    #[test]
    fn test_unknown_view_type() {
        let mut workbench = workbench();
        let leaf = workbench.new_main_leaf();
        let err = workbench.set_view_state(leaf, "missing").unwrap_err();
        assert!(matches!(err, WorkbenchError::UnknownViewType(_)));
    }

    #[test]
    fn test_right_leaf_unavailable_when_dock_disabled() {
        let mut workbench = workbench();
        workbench.right_dock_enabled = false;
        assert!(workbench.right_leaf().is_none());
    }

    #[test]
    fn test_empty_right_leaf_is_reused() {
        let mut workbench = workbench();
        let a = workbench.right_leaf().unwrap();
        let b = workbench.right_leaf().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_reveal_expands_collapsed_dock() {
        let mut workbench = workbench();
        let leaf = workbench.right_leaf().unwrap();
        workbench.right_dock_collapsed = true;
        assert!(!workbench.is_revealed(leaf));

        workbench.reveal(leaf);
        assert!(workbench.is_revealed(leaf));
        assert!(!workbench.right_dock_collapsed);
    }

    #[test]
    fn test_detach_removes_leaf() {
        let mut workbench = workbench();
        let leaf = workbench.new_main_leaf();
        workbench.set_view_state(leaf, "counter").unwrap();
        workbench.reveal(leaf);

        workbench.detach(leaf);
        assert!(workbench.leaves_of_type("counter").is_empty());
        assert!(!workbench.is_revealed(leaf));
    }
}
