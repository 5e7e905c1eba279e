//! Explorer panel
//!
//! Clicking a file makes it the active file that quarto commands resolve
//! against. Project roots are marked so it is clear which folder a render
//! or preview will run in.

use eframe::egui;

use crate::app::RobsidianApp;
use crate::core::file_system::FileNode;

pub struct FileTreePanel;

impl FileTreePanel {
    pub fn show(ui: &mut egui::Ui, app: &mut RobsidianApp) {
        ui.horizontal(|ui| {
            ui.heading("Explorer");
            ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                if ui.button("\u{21BB}").on_hover_text("Rescan vault").clicked() {
                    app.refresh_file_tree();
                }
            });
        });
        ui.separator();

        let Some(root) = app.file_tree.root.clone() else {
            ui.label("No vault open");
            ui.add_space(10.0);
            if ui.button("Open Vault...").clicked() {
                if let Some(path) = rfd::FileDialog::new().pick_folder() {
                    app.open_vault(path);
                }
            }
            return;
        };

        egui::ScrollArea::vertical()
            .id_salt("explorer_scroll")
            .show(ui, |ui| {
                for child in &root.children {
                    Self::show_node(ui, child, app);
                }
            });
    }

    fn show_node(ui: &mut egui::Ui, node: &FileNode, app: &mut RobsidianApp) {
        if node.is_dir {
            Self::show_folder(ui, node, app);
        } else {
            Self::show_file(ui, node, app);
        }
    }

    fn show_folder(ui: &mut egui::Ui, node: &FileNode, app: &mut RobsidianApp) {
        let id = ui.make_persistent_id(&node.path);
        let icon = match (node.is_project_root(), node.expanded) {
            (true, _) => "\u{1F4D8}",
            (false, true) => "\u{1F4C2}",
            (false, false) => "\u{1F4C1}",
        };

        egui::collapsing_header::CollapsingState::load_with_default_open(
            ui.ctx(),
            id,
            node.expanded,
        )
        .show_header(ui, |ui| {
            let label = ui.selectable_label(false, format!("{} {}", icon, node.name));
            let label = if node.is_project_root() {
                label.on_hover_text("Quarto project")
            } else {
                label
            };
            if label.clicked() {
                app.file_tree.toggle_expanded(&node.path);
            }
        })
        .body(|ui| {
            for child in &node.children {
                Self::show_node(ui, child, app);
            }
        });
    }

    fn show_file(ui: &mut egui::Ui, node: &FileNode, app: &mut RobsidianApp) {
        let selected = app.active_file_absolute().as_deref() == Some(node.path.as_path());

        ui.horizontal(|ui| {
            ui.add_space(16.0);
            let text = if node.is_document() {
                egui::RichText::new(format!("\u{1F4DD} {}", node.name))
            } else {
                egui::RichText::new(format!("\u{1F4C4} {}", node.name)).weak()
            };
            if ui.selectable_label(selected, text).clicked() {
                app.select_file(&node.path);
            }
        });
    }
}
