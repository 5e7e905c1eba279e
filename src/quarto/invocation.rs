//! Command lines passed to the quarto binary

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::Command;

/// Render target meaning "the whole project"
pub const WHOLE_PROJECT: &str = ".";

/// Project templates offered by `quarto create project`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProjectType {
    #[default]
    Default,
    Website,
    Blog,
    Book,
    Manuscript,
}

impl ProjectType {
    pub const ALL: [ProjectType; 5] = [
        ProjectType::Default,
        ProjectType::Website,
        ProjectType::Blog,
        ProjectType::Book,
        ProjectType::Manuscript,
    ];

    pub fn as_arg(self) -> &'static str {
        match self {
            ProjectType::Default => "default",
            ProjectType::Website => "website",
            ProjectType::Blog => "blog",
            ProjectType::Book => "book",
            ProjectType::Manuscript => "manuscript",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ProjectType::Default => "Default Project",
            ProjectType::Website => "Website",
            ProjectType::Blog => "Blog",
            ProjectType::Book => "Book",
            ProjectType::Manuscript => "Manuscript",
        }
    }
}

/// Computation engines offered by `quarto create project`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Engine {
    #[default]
    Markdown,
    Jupyter,
    Knitr,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::Markdown, Engine::Jupyter, Engine::Knitr];

    pub fn as_arg(self) -> &'static str {
        match self {
            Engine::Markdown => "markdown",
            Engine::Jupyter => "jupyter",
            Engine::Knitr => "knitr",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Engine::Markdown => "Markdown (standard)",
            Engine::Jupyter => "Jupyter (python)",
            Engine::Knitr => "Knitr (R)",
        }
    }
}

/// A fully specified quarto call: program, arguments and working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
}

impl Invocation {
    /// `quarto preview . --no-browser --no-watch-inputs` in the project root
    pub fn preview(binary: &str, project_dir: &Path) -> Self {
        Self::new(
            binary,
            ["preview", ".", "--no-browser", "--no-watch-inputs"],
            project_dir,
        )
    }

    /// `quarto render <target>`; `target` is a relative file or [`WHOLE_PROJECT`]
    pub fn render(binary: &str, working_dir: &Path, target: &str) -> Self {
        Self::new(binary, ["render", target], working_dir)
    }

    /// `quarto create project <type> <name> --engine <engine> --no-open`
    pub fn create_project(
        binary: &str,
        parent_dir: &Path,
        name: &str,
        project_type: ProjectType,
        engine: Engine,
    ) -> Self {
        Self::new(
            binary,
            [
                "create",
                "project",
                project_type.as_arg(),
                name,
                "--engine",
                engine.as_arg(),
                "--no-open",
            ],
            parent_dir,
        )
    }

    fn new<'a>(binary: &str, args: impl IntoIterator<Item = &'a str>, cwd: &Path) -> Self {
        Self {
            program: binary.to_string(),
            args: args.into_iter().map(str::to_string).collect(),
            cwd: cwd.to_path_buf(),
        }
    }

    /// Build the process command. The environment is inherited so tools on
    /// the user's PATH (R, Python, ...) are visible to quarto.
    pub fn command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        cmd
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
