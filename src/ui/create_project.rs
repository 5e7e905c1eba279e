//! Dialog collecting the options for a new Quarto project

use eframe::egui;

use crate::quarto::{Engine, ProjectType};

/// A validated create request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateProjectRequest {
    pub project_type: ProjectType,
    pub name: String,
    pub engine: Engine,
}

/// "Create New Quarto Project" form
#[derive(Debug, Default)]
pub struct CreateProjectDialog {
    pub visible: bool,
    pub project_type: ProjectType,
    pub name: String,
    pub engine: Engine,
}

impl CreateProjectDialog {
    /// Open the dialog with fresh defaults
    pub fn open(&mut self) {
        *self = Self {
            visible: true,
            ..Self::default()
        };
    }

    /// Validate the form, closing it on success
    pub fn submit(&mut self) -> Result<CreateProjectRequest, &'static str> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err("Please enter a project name");
        }
        let request = CreateProjectRequest {
            project_type: self.project_type,
            name: name.to_string(),
            engine: self.engine,
        };
        self.visible = false;
        Ok(request)
    }

    /// Draw the dialog. Yields the request when Create was pressed, or the
    /// validation message when it was rejected.
    pub fn show(&mut self, ctx: &egui::Context) -> Option<Result<CreateProjectRequest, &'static str>> {
        if !self.visible {
            return None;
        }

        let mut open = true;
        let mut result = None;
        egui::Window::new("Create New Quarto Project")
            .collapsible(false)
            .resizable(false)
            .open(&mut open)
            .show(ctx, |ui| {
                egui::Grid::new("create_project_grid")
                    .num_columns(2)
                    .spacing([12.0, 8.0])
                    .show(ui, |ui| {
                        ui.label("Project Type")
                            .on_hover_text("Select the type of project to create");
                        egui::ComboBox::from_id_salt("project_type")
                            .selected_text(self.project_type.label())
                            .show_ui(ui, |ui| {
                                for ty in ProjectType::ALL {
                                    ui.selectable_value(&mut self.project_type, ty, ty.label());
                                }
                            });
                        ui.end_row();

                        ui.label("Project Name")
                            .on_hover_text("Name of the project folder");
                        ui.text_edit_singleline(&mut self.name);
                        ui.end_row();

                        ui.label("Engine")
                            .on_hover_text("Select the computation engine");
                        egui::ComboBox::from_id_salt("engine")
                            .selected_text(self.engine.label())
                            .show_ui(ui, |ui| {
                                for engine in Engine::ALL {
                                    ui.selectable_value(&mut self.engine, engine, engine.label());
                                }
                            });
                        ui.end_row();
                    });

                ui.separator();
                if ui.button("Create").clicked() {
                    result = Some(self.submit());
                }
            });

        if !open {
            self.visible = false;
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let mut dialog = CreateProjectDialog::default();
        dialog.open();
        assert!(dialog.visible);
        assert_eq!(dialog.project_type, ProjectType::Default);
        assert_eq!(dialog.engine, Engine::Markdown);
    }

    #[test]
    fn test_blank_name_is_rejected_and_dialog_stays_open() {
        let mut dialog = CreateProjectDialog::default();
        dialog.open();
        dialog.name = "   ".to_string();

        assert_eq!(dialog.submit(), Err("Please enter a project name"));
        assert!(dialog.visible);
    }

    #[test]
    fn test_submit_closes_and_trims() {
        let mut dialog = CreateProjectDialog::default();
        dialog.open();
        dialog.name = " thesis ".to_string();
        dialog.project_type = ProjectType::Manuscript;
        dialog.engine = Engine::Jupyter;

        let request = dialog.submit().unwrap();
        assert_eq!(
            request,
            CreateProjectRequest {
                project_type: ProjectType::Manuscript,
                name: "thesis".to_string(),
                engine: Engine::Jupyter,
            }
        );
        assert!(!dialog.visible);
    }

    #[test]
    fn test_reopen_resets_form() {
        let mut dialog = CreateProjectDialog::default();
        dialog.open();
        dialog.name = "old".to_string();
        dialog.engine = Engine::Knitr;
        dialog.open();
        assert!(dialog.name.is_empty());
        assert_eq!(dialog.engine, Engine::Markdown);
    }
}
