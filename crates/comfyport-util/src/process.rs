use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use crate::errors::PortableError;

/// Keep at most this many trailing bytes of captured output in error reports.
const MAX_REPORTED_OUTPUT: usize = 16 * 1024;

/// Builder for constructing and executing external processes.
///
/// Provides a fluent API for setting program, arguments, environment variables, and working directory.
pub struct CommandBuilder {
    program: String,
    args: Vec<String>,
    env: HashMap<String, String>,
    cwd: Option<PathBuf>,
}

impl CommandBuilder {
    /// Create a new builder for the given program.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: HashMap::new(),
            cwd: None,
        }
    }

    /// Append a single argument.
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the child process.
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Set the working directory for the child process.
    pub fn cwd(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    /// The command line as it would be typed in a shell, for logs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Execute the command and return its output, whatever the exit status.
    pub fn exec(&self) -> Result<Output, PortableError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for (k, v) in &self.env {
            cmd.env(k, v);
        }
        if let Some(ref dir) = self.cwd {
            cmd.current_dir(dir);
        }
        cmd.output().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => PortableError::ExternalTool {
                tool: self.program.clone(),
                status: "not found".to_string(),
                output: format!("Could not start `{}`: {e}. Is it installed and on PATH?", self.program),
            },
            _ => PortableError::Io(e),
        })
    }

    /// Execute the command and fail with [`PortableError::ExternalTool`] on a
    /// non-zero exit, carrying the captured stdout and stderr.
    pub fn run(&self) -> Result<Output, PortableError> {
        tracing::debug!("Running: {}", self.display());
        let output = self.exec()?;
        if output.status.success() {
            return Ok(output);
        }
        Err(PortableError::ExternalTool {
            tool: self.display(),
            status: output.status.to_string(),
            output: captured_output(&output),
        })
    }
}

/// Join stdout and stderr of a finished process, truncated from the front
/// so that the most recent lines survive.
pub fn captured_output(output: &Output) -> String {
    let mut text = String::from_utf8_lossy(&output.stdout).trim_end().to_string();
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stderr = stderr.trim_end();
    if !stderr.is_empty() {
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(stderr);
    }
    if text.len() > MAX_REPORTED_OUTPUT {
        let mut cut = text.len() - MAX_REPORTED_OUTPUT;
        while !text.is_char_boundary(cut) {
            cut += 1;
        }
        text = format!("...\n{}", &text[cut..]);
    }
    text
}
