//! An external invocation: program plus ordered arguments

use std::fmt;
use std::path::PathBuf;

/// A fully built command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolCommand {
    /// Binary to execute
    pub program: PathBuf,
    /// Arguments, in order
    pub args: Vec<String>,
}

impl ToolCommand {
    /// Create a command with no arguments
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new() }
    }

    /// Append one argument
    pub fn arg(&mut self, arg: impl Into<String>) -> &mut Self {
        self.args.push(arg.into());
        self
    }

    /// Append a flag and its value
    pub fn flag_value(&mut self, flag: &str, value: impl Into<String>) -> &mut Self {
        self.args.push(flag.to_string());
        self.args.push(value.into());
        self
    }
}

impl fmt::Display for ToolCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            if arg.is_empty() || arg.chars().any(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
