use std::{
    io::{self, Write},
    path::{Path, PathBuf},
};

use nix::unistd;
use once_cell::sync::Lazy;

use crate::config::PromptMode;

static HOSTNAME: Lazy<String> = Lazy::new(|| {
    unistd::gethostname()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
});

/// Process-wide state the shell reads and the builtins mutate.
#[derive(Debug, Clone)]
pub struct ShellContext {
    working_dir: PathBuf,
    user: String,
    host: String,
    prompt: PromptMode,
}

impl ShellContext {
    pub fn new(working_dir: impl Into<PathBuf>, user: &str, host: &str) -> Self {
        Self {
            working_dir: working_dir.into(),
            user: user.to_owned(),
            host: host.to_owned(),
            prompt: PromptMode::default(),
        }
    }

    /// Captures the current process's working directory, `$USER` and host
    /// name.
    pub fn from_env() -> io::Result<Self> {
        let user = std::env::var("USER").unwrap_or_default();
        Ok(Self::new(std::env::current_dir()?, &user, &HOSTNAME))
    }

    pub fn with_prompt(mut self, prompt: PromptMode) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn working_dir(&self) -> &Path {
        &self.working_dir
    }

    /// Changes the working directory of the shell process itself, so every
    /// program spawned afterwards inherits it.
    pub fn change_dir(&mut self, path: &str) -> nix::Result<()> {
        unistd::chdir(path)?;
        self.working_dir = unistd::getcwd()?;
        std::env::set_var("PWD", &self.working_dir);
        Ok(())
    }

    pub fn prompt(&self) -> String {
        format!(
            "{}@{}:{}> ",
            self.user,
            self.host,
            self.working_dir.display()
        )
    }

    pub fn shows_prompt(&self, interactive: bool) -> bool {
        match self.prompt {
            PromptMode::Auto => interactive,
            PromptMode::Always => true,
            PromptMode::Never => false,
        }
    }

    pub fn render<W: Write>(&self, out: &mut W) -> io::Result<()> {
        write!(out, "{}", self.prompt())?;
        out.flush()
    }
}
