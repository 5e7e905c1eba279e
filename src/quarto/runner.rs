//! Preview server registry and one-shot quarto runs
//!
//! The registry maps a project directory to at most one live preview
//! server. It is owned by the UI thread: background tasks never touch it
//! directly, they report through [`RunnerEvent`]s which
//! [`Runner::poll_events`] applies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, ChildStdout};
use tokio::runtime::Handle;
use tokio::sync::{mpsc, oneshot};

use super::invocation::{Engine, Invocation, ProjectType};
use super::ready::scan_ready_url;
use super::QuartoError;

/// Identity of one spawned preview process, unique for the runner's lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(u64);

/// Lifecycle of a registered preview server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessState {
    /// Spawned, no ready line seen yet
    Starting,
    /// Announced its local URL
    Running,
}

/// Which one-shot operation finished
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OneShotKind {
    Render { target: String },
    Create { name: String },
}

/// Notifications produced by background tasks
#[derive(Debug)]
pub enum RunnerEvent {
    /// A preview server printed its URL. `first` is set on the first
    /// announcement of that process.
    Ready {
        project: PathBuf,
        process: ProcessId,
        url: String,
        first: bool,
    },
    /// A preview process is gone, whatever the reason
    Exited {
        project: PathBuf,
        process: ProcessId,
        code: Option<i32>,
    },
    /// A render or create run completed
    Finished {
        kind: OneShotKind,
        result: Result<(), QuartoError>,
    },
}

struct ManagedProcess {
    id: ProcessId,
    pid: Option<u32>,
    state: ProcessState,
    url: Option<String>,
    stop_tx: Option<oneshot::Sender<()>>,
}

impl ManagedProcess {
    /// Ask the supervisor to signal the process. Exit is not awaited.
    fn terminate(&mut self) {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Spawns and tracks quarto subprocesses
pub struct Runner {
    handle: Handle,
    processes: HashMap<PathBuf, ManagedProcess>,
    next_id: u64,
    events_tx: mpsc::UnboundedSender<RunnerEvent>,
    events_rx: mpsc::UnboundedReceiver<RunnerEvent>,
}

impl Runner {
    /// Create a runner spawning its tasks on `handle`
    pub fn new(handle: Handle) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            handle,
            processes: HashMap::new(),
            next_id: 0,
            events_tx,
            events_rx,
        }
    }

    /// Start a preview server for `project_dir`, replacing any running one.
    pub fn start(&mut self, project_dir: &Path, binary: &str) -> Result<ProcessId, QuartoError> {
        // Stop first so a stale server does not hold on to its port
        self.stop(project_dir);

        let invocation = Invocation::preview(binary, project_dir);
        let _guard = self.handle.enter();
        let mut command = invocation.command();
        command.kill_on_drop(true);
        let mut child = command.spawn().map_err(|source| QuartoError::Spawn {
            binary: invocation.program.clone(),
            source,
        })?;

        self.next_id += 1;
        let id = ProcessId(self.next_id);
        let pid = child.id();
        let project = project_dir.to_path_buf();
        tracing::info!(project = %project.display(), ?pid, "Started `{}`", invocation);

        if let Some(stdout) = child.stdout.take() {
            self.handle.spawn(scan_stdout(
                stdout,
                project.clone(),
                id,
                self.events_tx.clone(),
            ));
        }
        if let Some(stderr) = child.stderr.take() {
            self.handle.spawn(log_lines(Some(stderr), "[quarto stderr]"));
        }

        let (stop_tx, stop_rx) = oneshot::channel();
        self.handle.spawn(supervise(
            child,
            stop_rx,
            project.clone(),
            id,
            self.events_tx.clone(),
        ));

        self.processes.insert(
            project,
            ManagedProcess {
                id,
                pid,
                state: ProcessState::Starting,
                url: None,
                stop_tx: Some(stop_tx),
            },
        );
        Ok(id)
    }

    /// Stop the preview server of `project_dir`. Returns whether one was registered.
    pub fn stop(&mut self, project_dir: &Path) -> bool {
        match self.processes.remove(project_dir) {
            Some(mut process) => {
                tracing::info!(project = %project_dir.display(), pid = ?process.pid, "Stopping preview");
                process.terminate();
                true
            }
            None => false,
        }
    }

    /// Stop every tracked preview server. Returns how many were stopped.
    pub fn stop_all(&mut self) -> usize {
        let count = self.processes.len();
        for (project, mut process) in self.processes.drain() {
            tracing::info!(project = %project.display(), pid = ?process.pid, "Stopping preview");
            process.terminate();
        }
        count
    }

    /// Drain pending events, updating the registry along the way.
    ///
    /// Ready announcements from a process that has since been replaced or
    /// stopped are dropped. An exit only removes the registry entry when
    /// that entry still belongs to the exited process.
    pub fn poll_events(&mut self) -> Vec<RunnerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events_rx.try_recv() {
            match &event {
                RunnerEvent::Ready {
                    project,
                    process,
                    url,
                    ..
                } => match self.processes.get_mut(project) {
                    Some(entry) if entry.id == *process => {
                        entry.state = ProcessState::Running;
                        entry.url = Some(url.clone());
                    }
                    _ => {
                        tracing::debug!(project = %project.display(), "Ignoring ready line from a replaced preview");
                        continue;
                    }
                },
                RunnerEvent::Exited {
                    project, process, ..
                } => {
                    if self
                        .processes
                        .get(project)
                        .is_some_and(|entry| entry.id == *process)
                    {
                        self.processes.remove(project);
                    }
                }
                RunnerEvent::Finished { .. } => {}
            }
            events.push(event);
        }
        events
    }

    /// Render `target` in `working_dir` in the background; the outcome
    /// arrives as [`RunnerEvent::Finished`].
    pub fn spawn_render(&self, working_dir: PathBuf, target: String, binary: String) {
        let events = self.events_tx.clone();
        self.handle.spawn(async move {
            let result = render(&binary, &working_dir, &target).await;
            let _ = events.send(RunnerEvent::Finished {
                kind: OneShotKind::Render { target },
                result,
            });
        });
    }

    /// Create a project under `parent_dir` in the background
    pub fn spawn_create_project(
        &self,
        parent_dir: PathBuf,
        name: String,
        project_type: ProjectType,
        engine: Engine,
        binary: String,
    ) {
        let events = self.events_tx.clone();
        self.handle.spawn(async move {
            let result = create_project(&binary, &parent_dir, &name, project_type, engine).await;
            let _ = events.send(RunnerEvent::Finished {
                kind: OneShotKind::Create { name },
                result,
            });
        });
    }

    #[allow(dead_code)]
    pub fn state(&self, project_dir: &Path) -> Option<ProcessState> {
        self.processes.get(project_dir).map(|p| p.state)
    }

    #[allow(dead_code)]
    pub fn process_id(&self, project_dir: &Path) -> Option<ProcessId> {
        self.processes.get(project_dir).map(|p| p.id)
    }

    /// Latest URL announced by the preview of `project_dir`
    pub fn url(&self, project_dir: &Path) -> Option<&str> {
        self.processes
            .get(project_dir)
            .and_then(|p| p.url.as_deref())
    }

    /// Tracked projects with their state, sorted by path
    pub fn projects(&self) -> Vec<(&Path, ProcessState)> {
        let mut projects: Vec<_> = self
            .processes
            .iter()
            .map(|(path, p)| (path.as_path(), p.state))
            .collect();
        projects.sort_by(|a, b| a.0.cmp(b.0));
        projects
    }

    #[allow(dead_code)]
    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }
}

impl Drop for Runner {
    fn drop(&mut self) {
        self.stop_all();
    }
}

/// Run `quarto render <target>` to completion
pub async fn render(binary: &str, working_dir: &Path, target: &str) -> Result<(), QuartoError> {
    run_to_completion(Invocation::render(binary, working_dir, target), "[quarto render]").await
}

/// Run `quarto create project ...` to completion
pub async fn create_project(
    binary: &str,
    parent_dir: &Path,
    name: &str,
    project_type: ProjectType,
    engine: Engine,
) -> Result<(), QuartoError> {
    let invocation = Invocation::create_project(binary, parent_dir, name, project_type, engine);
    run_to_completion(invocation, "[quarto create]").await
}

async fn run_to_completion(invocation: Invocation, label: &str) -> Result<(), QuartoError> {
    let mut child = invocation
        .command()
        .spawn()
        .map_err(|source| QuartoError::Spawn {
            binary: invocation.program.clone(),
            source,
        })?;
    tracing::info!(cwd = %invocation.cwd.display(), "Running `{}`", invocation);

    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let (status, _, _) = tokio::join!(
        child.wait(),
        log_lines(stdout, label),
        log_lines(stderr, label)
    );
    let status = status.map_err(QuartoError::Wait)?;

    match status.code() {
        Some(0) => Ok(()),
        Some(code) => {
            tracing::warn!(code, "`{}` failed", invocation);
            Err(QuartoError::Exit { code })
        }
        None => Err(QuartoError::Signalled),
    }
}

/// Log every stdout line and report each ready announcement
async fn scan_stdout(
    stdout: ChildStdout,
    project: PathBuf,
    process: ProcessId,
    events: mpsc::UnboundedSender<RunnerEvent>,
) {
    let mut lines = BufReader::new(stdout).lines();
    let mut announced = false;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(project = %project.display(), "Failed reading quarto output: {}", e);
                break;
            }
        };
        tracing::info!("[quarto] {}", line);

        if let Some(url) = scan_ready_url(&line) {
            let sent = events.send(RunnerEvent::Ready {
                project: project.clone(),
                process,
                url: url.to_string(),
                first: !announced,
            });
            if sent.is_err() {
                break;
            }
            announced = true;
        }
    }
}

async fn log_lines<R>(reader: Option<R>, label: &str)
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else { return };
    let mut lines = BufReader::new(reader).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        tracing::info!("{} {}", label, line);
    }
}

/// Own the child until it exits or a stop is requested
async fn supervise(
    mut child: Child,
    mut stop_rx: oneshot::Receiver<()>,
    project: PathBuf,
    process: ProcessId,
    events: mpsc::UnboundedSender<RunnerEvent>,
) {
    let exited = tokio::select! {
        status = child.wait() => Some(status),
        _ = &mut stop_rx => None,
    };
    let status = match exited {
        Some(status) => status,
        None => {
            terminate(&mut child);
            child.wait().await
        }
    };

    let code = match status {
        Ok(status) => status.code(),
        Err(e) => {
            tracing::warn!(project = %project.display(), "Failed waiting for quarto: {}", e);
            None
        }
    };
    tracing::info!(project = %project.display(), ?code, "Quarto process exited");
    let _ = events.send(RunnerEvent::Exited {
        project,
        process,
        code,
    });
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    // `id()` is None once the child has been reaped, so the pid is still ours.
    let Some(pid) = child.id() else { return };
    let Ok(pid) = libc::pid_t::try_from(pid) else { return };
    let status = unsafe { libc::kill(pid, libc::SIGTERM) };
    if status != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            tracing::warn!(pid, "Failed to send SIGTERM: {}", err);
        }
    }
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    if let Err(e) = child.start_kill() {
        tracing::warn!("Failed to terminate quarto: {}", e);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    use std::os::unix::fs::PermissionsExt;
    use std::time::{Duration, Instant};

    /// Stand-in for the quarto binary
    const FAKE_QUARTO: &str = r#"#!/bin/sh
case "$1" in
  preview)
    echo "Preparing to preview"
    echo "Browsing at http://localhost:4200/"
    exec sleep 30
    ;;
  render)
    echo "rendering $2"
    [ "$2" = "report.qmd" ] && exit 0
    [ "$2" = "." ] && exit 0
    echo "ERROR: cannot render $2" >&2
    exit 1
    ;;
  create)
    mkdir "$4" && exit 0
    exit 3
    ;;
esac
exit 2
"#;

    /// Preview that dies on its own right after announcing
    const CRASHING_QUARTO: &str = r#"#!/bin/sh
echo "Listening on http://localhost:5555/"
exit 7
"#;

    /// Announces once, then moves to another port
    const REBINDING_QUARTO: &str = r#"#!/bin/sh
echo "Browsing at http://localhost:4200/"
sleep 0.3
echo "Listening on http://localhost:4300/"
exec sleep 30
"#;

    fn write_script(dir: &Path, body: &str) -> String {
        let path = dir.join("quarto");
        std::fs::write(&path, body).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path.to_string_lossy().to_string()
    }

    async fn wait_for(
        runner: &mut Runner,
        mut pred: impl FnMut(&RunnerEvent) -> bool,
    ) -> Vec<RunnerEvent> {
        let deadline = Instant::now() + Duration::from_secs(10);
        let mut seen = Vec::new();
        loop {
            for event in runner.poll_events() {
                let hit = pred(&event);
                seen.push(event);
                if hit {
                    return seen;
                }
            }
            assert!(Instant::now() < deadline, "timed out, saw {:?}", seen);
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_ready_line_reports_url() {
        let tools = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), FAKE_QUARTO);
        let mut runner = Runner::new(Handle::current());

        let id = runner.start(project.path(), &binary).unwrap();
        assert_eq!(runner.state(project.path()), Some(ProcessState::Starting));

        let events = wait_for(&mut runner, |e| matches!(e, RunnerEvent::Ready { .. })).await;
        match events.last() {
            Some(RunnerEvent::Ready {
                url,
                process,
                first,
                ..
            }) => {
                assert_eq!(url, "http://localhost:4200");
                assert_eq!(*process, id);
                assert!(*first);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(runner.state(project.path()), Some(ProcessState::Running));
        assert_eq!(runner.url(project.path()), Some("http://localhost:4200"));

        assert_eq!(runner.stop_all(), 1);
        assert!(runner.is_empty());
    }

    #[tokio::test]
    async fn test_later_ready_lines_update_url_without_reannouncing() {
        let tools = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), REBINDING_QUARTO);
        let mut runner = Runner::new(Handle::current());

        runner.start(project.path(), &binary).unwrap();
        let mut ready = 0;
        let events = wait_for(&mut runner, |e| {
            if matches!(e, RunnerEvent::Ready { .. }) {
                ready += 1;
            }
            ready == 2
        })
        .await;

        let announced: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                RunnerEvent::Ready { url, first, .. } => Some((url.as_str(), *first)),
                _ => None,
            })
            .collect();
        assert_eq!(
            announced,
            vec![("http://localhost:4200", true), ("http://localhost:4300", false)]
        );
        assert_eq!(runner.url(project.path()), Some("http://localhost:4300"));

        runner.stop_all();
    }

    #[tokio::test]
    async fn test_restart_replaces_and_terminates_previous() {
        let tools = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), FAKE_QUARTO);
        let mut runner = Runner::new(Handle::current());

        let first = runner.start(project.path(), &binary).unwrap();
        let second = runner.start(project.path(), &binary).unwrap();
        assert_ne!(first, second);
        assert_eq!(runner.len(), 1);

        wait_for(&mut runner, |e| {
            matches!(e, RunnerEvent::Exited { process, .. } if *process == first)
        })
        .await;

        // The first exit must not evict its replacement
        assert_eq!(runner.process_id(project.path()), Some(second));
        assert_eq!(runner.len(), 1);

        runner.stop_all();
        assert!(runner.is_empty());
    }

    #[tokio::test]
    async fn test_stop_without_entry_is_noop() {
        let mut runner = Runner::new(Handle::current());
        assert!(!runner.stop(Path::new("/no/such/project")));
        assert!(runner.poll_events().is_empty());
    }

    #[tokio::test]
    async fn test_exit_removes_entry() {
        let tools = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), CRASHING_QUARTO);
        let mut runner = Runner::new(Handle::current());

        let id = runner.start(project.path(), &binary).unwrap();
        let events = wait_for(&mut runner, |e| matches!(e, RunnerEvent::Exited { .. })).await;
        match events.last() {
            Some(RunnerEvent::Exited { process, code, .. }) => {
                assert_eq!(*process, id);
                assert_eq!(*code, Some(7));
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(runner.is_empty());
    }

    #[tokio::test]
    async fn test_stop_all_clears_every_project() {
        let tools = tempfile::tempdir().unwrap();
        let a = tempfile::tempdir().unwrap();
        let b = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), FAKE_QUARTO);
        let mut runner = Runner::new(Handle::current());

        runner.start(a.path(), &binary).unwrap();
        runner.start(b.path(), &binary).unwrap();
        assert_eq!(runner.projects().len(), 2);

        assert_eq!(runner.stop_all(), 2);
        assert!(runner.is_empty());

        let mut exits = 0;
        wait_for(&mut runner, |e| {
            if matches!(e, RunnerEvent::Exited { .. }) {
                exits += 1;
            }
            exits == 2
        })
        .await;
        assert!(runner.is_empty());
    }

    #[tokio::test]
    async fn test_spawn_failure_is_reported() {
        let project = tempfile::tempdir().unwrap();
        let mut runner = Runner::new(Handle::current());

        let err = runner
            .start(project.path(), "/definitely/not/quarto")
            .unwrap_err();
        assert!(matches!(err, QuartoError::Spawn { .. }));
        assert!(runner.is_empty());

        let err = render("/definitely/not/quarto", project.path(), ".")
            .await
            .unwrap_err();
        assert!(matches!(err, QuartoError::Spawn { .. }));
    }

    #[tokio::test]
    async fn test_render_exit_codes() {
        let tools = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), FAKE_QUARTO);

        render(&binary, project.path(), "report.qmd").await.unwrap();
        render(&binary, project.path(), crate::quarto::WHOLE_PROJECT)
            .await
            .unwrap();

        let err = render(&binary, project.path(), "broken.qmd")
            .await
            .unwrap_err();
        assert_eq!(err.exit_code(), Some(1));
        assert_eq!(err.to_string(), "Exited with code 1");
    }

    #[tokio::test]
    async fn test_create_project_runs_in_parent() {
        let tools = tempfile::tempdir().unwrap();
        let parent = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), FAKE_QUARTO);

        create_project(
            &binary,
            parent.path(),
            "my-book",
            ProjectType::Book,
            Engine::Markdown,
        )
        .await
        .unwrap();
        assert!(parent.path().join("my-book").is_dir());

        let err = create_project(
            &binary,
            parent.path(),
            "my-book",
            ProjectType::Book,
            Engine::Markdown,
        )
        .await
        .unwrap_err();
        assert_eq!(err.exit_code(), Some(3));
    }

    #[tokio::test]
    async fn test_background_render_reports_finished() {
        let tools = tempfile::tempdir().unwrap();
        let project = tempfile::tempdir().unwrap();
        let binary = write_script(tools.path(), FAKE_QUARTO);
        let mut runner = Runner::new(Handle::current());

        runner.spawn_render(
            project.path().to_path_buf(),
            "broken.qmd".to_string(),
            binary,
        );
        let events = wait_for(&mut runner, |e| matches!(e, RunnerEvent::Finished { .. })).await;
        match events.last() {
            Some(RunnerEvent::Finished { kind, result }) => {
                assert_eq!(
                    *kind,
                    OneShotKind::Render {
                        target: "broken.qmd".to_string()
                    }
                );
                assert_eq!(result.as_ref().unwrap_err().exit_code(), Some(1));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
