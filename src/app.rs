//! Main application state and UI coordination
//!
//! The application turns user commands into quarto runs: it resolves the
//! active file against the vault, finds its project, hands the work to the
//! [`Runner`] and routes the runner's events to notices and the preview
//! panel.

use std::path::{Path, PathBuf};
use std::time::Duration;

use eframe::egui;

use crate::commands::QuartoCommand;
use crate::core::config::AppConfig;
use crate::core::file_system::FileTree;
use crate::core::project::find_project_root;
use crate::core::vault::Vault;
use crate::quarto::{OneShotKind, QuartoError, Runner, RunnerEvent, WHOLE_PROJECT};
use crate::ui::create_project::{CreateProjectDialog, CreateProjectRequest};
use crate::ui::file_tree::FileTreePanel;
use crate::ui::preview;
use crate::ui::settings::SettingsWindow;
use crate::workbench::{Notices, Workbench};

const PROJECT_NOT_FOUND: &str = "No _quarto.yml found in parent directories. Is this a Quarto project?";

/// Working directory and target of a render
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderPlan {
    pub working_dir: PathBuf,
    pub target: String,
}

/// Render a single file from its own folder
pub fn render_file_plan(vault: &Vault, file: &Path) -> Option<RenderPlan> {
    let target = file.file_name()?.to_string_lossy().to_string();
    let folder = file.parent().unwrap_or(Path::new(""));
    Some(RenderPlan {
        working_dir: vault.absolute(folder),
        target,
    })
}

/// Render the whole project that owns `file`
pub fn render_project_plan(vault: &Vault, file: &Path) -> Option<RenderPlan> {
    let root = find_project_root(vault, file)?;
    Some(RenderPlan {
        working_dir: vault.absolute(&root),
        target: WHOLE_PROJECT.to_string(),
    })
}

/// New projects go next to the active file, or at the vault root
pub fn create_parent_dir(vault: &Vault, active_file: Option<&Path>) -> PathBuf {
    let folder = active_file
        .and_then(Path::parent)
        .unwrap_or(Path::new(""));
    vault.absolute(folder)
}

/// Start the preview server of `project_dir`, announcing the replaced one first
pub fn start_preview(runner: &mut Runner, notices: &mut Notices, project_dir: &Path, binary: &str) {
    if runner.stop(project_dir) {
        notices.show("Stopped Quarto preview");
    }
    notices.show("Starting Quarto preview...");
    if let Err(e) = runner.start(project_dir, binary) {
        tracing::error!("Quarto spawn error: {}", e);
        notices.show(format!("Quarto process error: {}", e));
    }
}

/// Main application state
pub struct RobsidianApp {
    /// Currently open vault
    pub vault: Option<Vault>,
    /// Active file, relative to the vault root
    pub active_file: Option<PathBuf>,
    /// File tree state
    pub file_tree: FileTree,
    /// Application configuration
    pub config: AppConfig,
    /// Quarto subprocesses
    runner: Runner,
    workbench: Workbench,
    notices: Notices,
    settings_window: SettingsWindow,
    create_dialog: CreateProjectDialog,
    /// Render/create runs not finished yet
    pending_runs: usize,
    /// Whether sidebar is visible
    pub sidebar_visible: bool,
}

impl RobsidianApp {
    /// Create a new application instance
    pub fn new(_cc: &eframe::CreationContext<'_>, runtime: tokio::runtime::Handle) -> Self {
        let config = match AppConfig::load() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config, using defaults: {:#}", e);
                AppConfig::default()
            }
        };

        let mut workbench = Workbench::new();
        preview::register(&mut workbench);

        let mut app = Self {
            vault: None,
            active_file: None,
            file_tree: FileTree::default(),
            config,
            runner: Runner::new(runtime),
            workbench,
            notices: Notices::new(),
            settings_window: SettingsWindow::default(),
            create_dialog: CreateProjectDialog::default(),
            pending_runs: 0,
            sidebar_visible: true,
        };

        if let Some(path) = app.config.last_vault.clone() {
            app.load_vault(&path);
        }
        app
    }

    /// Open a vault (workspace directory) and remember it
    pub fn open_vault(&mut self, path: PathBuf) {
        if self.load_vault(&path) {
            self.config.last_vault = Some(path.clone());
            self.config.add_recent_vault(path);
            if let Err(e) = self.config.save() {
                tracing::error!("Failed to save config: {:#}", e);
            }
        }
    }

    fn load_vault(&mut self, path: &Path) -> bool {
        let vault = match Vault::open(path) {
            Ok(vault) => vault,
            Err(e) => {
                tracing::error!("Failed to open vault: {:#}", e);
                self.notices.show(format!("Failed to open vault: {}", e));
                return false;
            }
        };
        self.file_tree = FileTree::from_path(vault.root()).unwrap_or_default();
        self.vault = Some(vault);
        self.active_file = None;
        true
    }

    pub fn refresh_file_tree(&mut self) {
        if let Err(e) = self.file_tree.refresh() {
            tracing::error!("Failed to refresh file tree: {:#}", e);
        }
    }

    /// Make the file at `absolute` the active file
    pub fn select_file(&mut self, absolute: &Path) {
        self.active_file = self.vault.as_ref().and_then(|v| v.relative(absolute));
    }

    pub fn active_file_absolute(&self) -> Option<PathBuf> {
        let vault = self.vault.as_ref()?;
        self.active_file.as_deref().map(|f| vault.absolute(f))
    }

    fn binary(&self) -> String {
        self.config.quarto.binary().to_string()
    }

    /// Run a Quarto command against the current workspace state
    pub fn execute(&mut self, command: QuartoCommand) {
        tracing::debug!("Executing command {}", command.id());
        match command {
            QuartoCommand::PreviewProject => self.preview_project(),
            QuartoCommand::StopAllPreviews => {
                self.runner.stop_all();
                self.notices.show("Stopped all Quarto preview servers.");
            }
            QuartoCommand::StopProjectPreview => self.stop_project_preview(),
            QuartoCommand::RenderFile => self.render_file(),
            QuartoCommand::RenderProject => self.render_project(),
            QuartoCommand::CreateProject => self.create_dialog.open(),
        }
    }

    /// Absolute root of the project owning the active file, with a notice when there is none
    fn active_project_dir(&mut self) -> Option<PathBuf> {
        let (vault, file) = match (self.vault.as_ref(), self.active_file.as_deref()) {
            (Some(vault), Some(file)) => (vault, file),
            _ => return None,
        };
        match find_project_root(vault, file) {
            Some(root) => Some(vault.absolute(&root)),
            None => {
                self.notices.show(PROJECT_NOT_FOUND);
                None
            }
        }
    }

    fn preview_project(&mut self) {
        let Some(project_dir) = self.active_project_dir() else {
            return;
        };

        let binary = self.binary();
        start_preview(&mut self.runner, &mut self.notices, &project_dir, &binary);
    }

    fn stop_project_preview(&mut self) {
        let Some(project_dir) = self.active_project_dir() else {
            return;
        };
        if self.runner.stop(&project_dir) {
            self.notices.show("Stopped Quarto preview");
        }
    }

    fn render_file(&mut self) {
        let plan = match (self.vault.as_ref(), self.active_file.as_deref()) {
            (Some(vault), Some(file)) => render_file_plan(vault, file),
            _ => None,
        };
        if let Some(plan) = plan {
            self.spawn_render(plan);
        }
    }

    fn render_project(&mut self) {
        let plan = match (self.vault.as_ref(), self.active_file.as_deref()) {
            (Some(vault), Some(file)) => render_project_plan(vault, file),
            _ => return,
        };
        match plan {
            Some(plan) => self.spawn_render(plan),
            None => self.notices.show(PROJECT_NOT_FOUND),
        }
    }

    fn spawn_render(&mut self, plan: RenderPlan) {
        let what = if plan.target == WHOLE_PROJECT {
            "project"
        } else {
            plan.target.as_str()
        };
        self.notices.show(format!("Rendering {}...", what));
        self.pending_runs += 1;
        let binary = self.binary();
        self.runner.spawn_render(plan.working_dir, plan.target, binary);
    }

    fn create_project(&mut self, request: CreateProjectRequest) {
        let Some(vault) = self.vault.as_ref() else {
            return;
        };
        let parent = create_parent_dir(vault, self.active_file.as_deref());

        self.notices
            .show(format!("Creating Quarto project: {}...", request.name));
        self.pending_runs += 1;
        let binary = self.binary();
        self.runner.spawn_create_project(
            parent,
            request.name,
            request.project_type,
            request.engine,
            binary,
        );
    }

    /// Apply background results to the UI
    fn handle_runner_events(&mut self) {
        for event in self.runner.poll_events() {
            match event {
                RunnerEvent::Ready { url, first, .. } => {
                    if let Err(e) = preview::activate_preview(&mut self.workbench, &url) {
                        tracing::error!("Failed to open preview panel: {}", e);
                    }
                    if first {
                        self.notices.show("Quarto Preview Ready!");
                    }
                }
                RunnerEvent::Exited { project, code, .. } => {
                    tracing::info!(project = %project.display(), ?code, "Quarto process exited");
                }
                RunnerEvent::Finished { kind, result } => {
                    self.pending_runs = self.pending_runs.saturating_sub(1);
                    self.report_finished(kind, result);
                }
            }
        }
    }

    fn report_finished(&mut self, kind: OneShotKind, result: Result<(), QuartoError>) {
        let (label, done) = match &kind {
            OneShotKind::Render { .. } => ("Render", "Quarto Render Complete!"),
            OneShotKind::Create { .. } => ("Create", "Quarto Project Created!"),
        };
        match result {
            Ok(()) => {
                self.notices.show(done);
                if matches!(kind, OneShotKind::Create { .. }) {
                    self.refresh_file_tree();
                }
            }
            Err(QuartoError::Exit { code }) => {
                self.notices
                    .show(format!("Quarto {} failed with code {}", label, code));
            }
            Err(e) => {
                tracing::error!("Quarto {} error: {}", label, e);
                self.notices.show(format!("Quarto {} error: {}", label, e));
            }
        }
    }

    /// Render the top menu bar
    fn render_menu_bar(&mut self, ctx: &egui::Context) {
        let vault_open = self.vault.is_some();
        let has_active_file = self.active_file.is_some();
        let mut command = None;

        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Vault...").clicked() {
                        if let Some(path) = rfd::FileDialog::new().pick_folder() {
                            self.open_vault(path);
                        }
                        ui.close();
                    }
                    if ui.button("Settings...").clicked() {
                        self.settings_window.visible = true;
                        ui.close();
                    }
                    ui.separator();
                    if ui.button("Exit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("View", |ui| {
                    if ui.button("Toggle Sidebar").clicked() {
                        self.sidebar_visible = !self.sidebar_visible;
                        ui.close();
                    }
                    if ui
                        .checkbox(&mut self.workbench.right_dock_enabled, "Right Dock")
                        .clicked()
                    {
                        ui.close();
                    }
                    if self.workbench.right_dock_collapsed && ui.button("Expand Right Dock").clicked() {
                        self.workbench.right_dock_collapsed = false;
                        ui.close();
                    }
                });

                ui.menu_button("Quarto", |ui| {
                    for cmd in QuartoCommand::ALL {
                        let enabled = cmd.is_available(vault_open, has_active_file);
                        if ui.add_enabled(enabled, egui::Button::new(cmd.name())).clicked() {
                            command = Some(cmd);
                            ui.close();
                        }
                    }
                });
            });
        });

        if let Some(command) = command {
            self.execute(command);
        }
    }

    /// Home page: workspace state and running previews
    fn show_home(&mut self, ui: &mut egui::Ui) {
        let Some(vault) = self.vault.as_ref() else {
            ui.vertical_centered(|ui| {
                ui.add_space(50.0);
                ui.label("No vault open");
                ui.label("Open a folder to preview and render Quarto documents");
            });
            return;
        };

        ui.heading("Quarto");
        ui.label(format!("Vault: {}", vault.root().display()));
        match self.active_file.as_deref() {
            Some(file) => {
                ui.label(format!("Active file: {}", file.display()));
                match find_project_root(vault, file) {
                    Some(root) => ui.label(format!("Project: {}", vault.absolute(&root).display())),
                    None => ui.weak("Not inside a Quarto project"),
                };
            }
            None => {
                ui.weak("Select a document in the explorer");
            }
        }

        ui.add_space(12.0);
        ui.heading("Preview servers");
        let mut stop = None;
        let projects = self.runner.projects();
        if projects.is_empty() {
            ui.weak("None running");
        }
        for (project, state) in projects {
            ui.horizontal(|ui| {
                ui.label(format!("{:?}", state));
                ui.monospace(project.display().to_string());
                if let Some(url) = self.runner.url(project) {
                    ui.hyperlink(url);
                }
                if ui.small_button("Stop").clicked() {
                    stop = Some(project.to_path_buf());
                }
            });
        }
        if let Some(project) = stop {
            if self.runner.stop(&project) {
                self.notices.show("Stopped Quarto preview");
            }
        }
    }
}

impl eframe::App for RobsidianApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.handle_runner_events();

        // Handle keyboard shortcuts
        let mut command = None;
        ctx.input(|i| {
            if i.modifiers.ctrl && i.key_pressed(egui::Key::B) {
                self.sidebar_visible = !self.sidebar_visible;
            }
            if i.modifiers.ctrl && i.modifiers.shift && i.key_pressed(egui::Key::P) {
                command = Some(QuartoCommand::PreviewProject);
            }
        });
        if let Some(command) = command {
            if command.is_available(self.vault.is_some(), self.active_file.is_some()) {
                self.execute(command);
            }
        }

        self.render_menu_bar(ctx);

        if self.sidebar_visible {
            egui::SidePanel::left("sidebar")
                .resizable(true)
                .default_width(self.config.ui.sidebar_width)
                .min_width(150.0)
                .show(ctx, |ui| {
                    FileTreePanel::show(ui, self);
                });
        }

        self.workbench.show_right_dock(ctx);

        egui::CentralPanel::default().show(ctx, |ui| {
            match self.workbench.show_main_tabs(ui) {
                Some(leaf) => self.workbench.show_leaf(ui, leaf),
                None => self.show_home(ui),
            }
        });

        if self.settings_window.show(ctx, &mut self.config) {
            tracing::debug!(binary = %self.config.quarto.binary(), "Quarto settings changed");
        }
        if let Some(result) = self.create_dialog.show(ctx) {
            match result {
                Ok(request) => self.create_project(request),
                Err(message) => self.notices.show(message),
            }
        }
        self.notices.ui(ctx);

        // Background runs report through the runner channel
        if !self.runner.is_empty() || self.pending_runs > 0 {
            ctx.request_repaint_after(Duration::from_millis(200));
        }
    }
}
