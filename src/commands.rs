//! User-facing Quarto commands

/// Commands listed in the Quarto menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuartoCommand {
    PreviewProject,
    StopAllPreviews,
    StopProjectPreview,
    RenderFile,
    RenderProject,
    CreateProject,
}

impl QuartoCommand {
    pub const ALL: [QuartoCommand; 6] = [
        QuartoCommand::PreviewProject,
        QuartoCommand::StopAllPreviews,
        QuartoCommand::StopProjectPreview,
        QuartoCommand::RenderFile,
        QuartoCommand::RenderProject,
        QuartoCommand::CreateProject,
    ];

    pub fn id(self) -> &'static str {
        match self {
            QuartoCommand::PreviewProject => "quarto-preview-project",
            QuartoCommand::StopAllPreviews => "quarto-stop-preview",
            QuartoCommand::StopProjectPreview => "quarto-stop-project",
            QuartoCommand::RenderFile => "quarto-render-file",
            QuartoCommand::RenderProject => "quarto-render-project",
            QuartoCommand::CreateProject => "quarto-create-project",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            QuartoCommand::PreviewProject => "Preview Project",
            QuartoCommand::StopAllPreviews => "Stop Preview Server",
            QuartoCommand::StopProjectPreview => "Stop Project Preview",
            QuartoCommand::RenderFile => "Render Current File",
            QuartoCommand::RenderProject => "Render Current Project",
            QuartoCommand::CreateProject => "Create New Project",
        }
    }

    /// Whether the command can run in the current workspace state
    pub fn is_available(self, vault_open: bool, has_active_file: bool) -> bool {
        match self {
            QuartoCommand::StopAllPreviews => true,
            QuartoCommand::CreateProject => vault_open,
            QuartoCommand::PreviewProject
            | QuartoCommand::StopProjectPreview
            | QuartoCommand::RenderFile
            | QuartoCommand::RenderProject => vault_open && has_active_file,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique() {
        let mut ids: Vec<_> = QuartoCommand::ALL.iter().map(|c| c.id()).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), QuartoCommand::ALL.len());
    }

    #[test]
    fn test_availability() {
        assert!(QuartoCommand::StopAllPreviews.is_available(false, false));
        assert!(!QuartoCommand::PreviewProject.is_available(true, false));
        assert!(QuartoCommand::PreviewProject.is_available(true, true));
        assert!(QuartoCommand::CreateProject.is_available(true, false));
        assert!(!QuartoCommand::CreateProject.is_available(false, false));
    }
}
