use std::{ffi::CString, path::PathBuf};

use itertools::Itertools;

/// One line's worth of work: the pipeline stages plus the directives that
/// apply to the line as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedCommand {
    pub stages: Vec<Stage>,
    /// Standard input of the first stage.
    pub input_file: Option<PathBuf>,
    /// Standard output of the last stage, created or truncated.
    pub output_file: Option<PathBuf>,
    pub background: bool,
}

impl ParsedCommand {
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// The single stage of a one-stage command. Builtins are only looked up
    /// through this.
    pub fn sole_stage(&self) -> Option<&Stage> {
        match self.stages.as_slice() {
            [stage] => Some(stage),
            _ => None,
        }
    }
}

/// The argument vector of one program in a pipeline. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage(Vec<String>);

impl Stage {
    pub fn new(argv: Vec<String>) -> Option<Self> {
        if argv.is_empty() {
            None
        } else {
            Some(Self(argv))
        }
    }

    pub fn program(&self) -> &str {
        &self.0[0]
    }

    pub fn args(&self) -> &[String] {
        &self.0[1..]
    }

    pub fn argv(&self) -> &[String] {
        &self.0
    }

    pub fn to_c_argv(&self) -> Result<Vec<CString>, std::ffi::NulError> {
        self.0.iter().map(|arg| CString::new(arg.as_bytes())).collect()
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.iter().join(" "))
    }
}
