use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::ExtractorConfig;
use crate::error::{CcscanError, Result};
use crate::progress::{ProgressEvent, ProgressParser};

/// Caption extraction command line, built here and executed by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractorCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl ExtractorCommand {
    pub fn new<S1: Into<String>, S2: Into<String>>(binary_path: S1, description: S2) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    /// Add an argument
    pub fn arg<S: Into<String>>(mut self, arg: S) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add multiple arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(|s| s.into()));
        self
    }

    /// Add the input file
    pub fn input<P: AsRef<Path>>(self, path: P) -> Self {
        self.arg(path.as_ref().to_string_lossy().to_string())
    }

    /// Binary followed by its arguments, the shape a host's `exec_command` expects
    pub fn to_exec_command(&self) -> Vec<String> {
        std::iter::once(self.binary_path.clone())
            .chain(self.args.iter().cloned())
            .collect()
    }

    /// Run the command, feeding every stdout line (split on `\n` and `\r`)
    /// through `parser` and handing the events to `on_progress`.
    pub async fn execute_with_progress<F>(&self, parser: &dyn ProgressParser, mut on_progress: F) -> Result<()>
    where
        F: FnMut(ProgressEvent),
    {
        debug!("Executing extractor command: {} {:?}", self.binary_path, self.args);
        debug!("Description: {}", self.description);

        let mut child = Command::new(&self.binary_path)
            .args(&self.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CcscanError::Extractor(format!("Failed to execute ccextractor: {}", e)))?;

        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| CcscanError::Extractor("Extractor stdout was not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| CcscanError::Extractor("Extractor stderr was not captured".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut buffer = Vec::new();
            let _ = stderr.read_to_end(&mut buffer).await;
            buffer
        });

        let mut pending = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = stdout.read(&mut chunk).await?;
            if read == 0 {
                break;
            }
            for &byte in &chunk[..read] {
                if byte == b'\n' || byte == b'\r' {
                    emit_line(&pending, parser, &mut on_progress);
                    pending.clear();
                } else {
                    pending.push(byte);
                }
            }
        }
        emit_line(&pending, parser, &mut on_progress);

        let status = child.wait().await?;
        let stderr = stderr_task.await.unwrap_or_default();

        if !status.success() {
            return Err(CcscanError::Extractor(format!(
                "{} failed: {}",
                self.description,
                String::from_utf8_lossy(&stderr)
            )));
        }

        Ok(())
    }
}

fn emit_line<F>(line: &[u8], parser: &dyn ProgressParser, on_progress: &mut F)
where
    F: FnMut(ProgressEvent),
{
    let line = String::from_utf8_lossy(line);
    if line.trim().is_empty() {
        return;
    }
    on_progress(parser.parse_progress(&line));
}

/// Builder for ccextractor invocations
#[derive(Debug, Clone)]
pub struct ExtractorCommandBuilder {
    config: ExtractorConfig,
}

impl ExtractorCommandBuilder {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    /// Build the caption extraction command for one input file
    pub fn extract<P: AsRef<Path>>(&self, input_path: P) -> ExtractorCommand {
        ExtractorCommand::new(&self.config.binary_path, "Caption extraction")
            .args(self.config.extra_args.iter().cloned())
            .input(input_path)
    }

    /// Build version check command
    pub fn version_check(&self) -> ExtractorCommand {
        ExtractorCommand::new(&self.config.binary_path, "Version check").arg("--version")
    }

    /// Check if ccextractor is available
    pub async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .args(&self.version_check().args)
            .output()
            .await
            .map_err(|e| CcscanError::Extractor(format!("ccextractor not found: {}", e)))?;

        if output.status.success() {
            info!("ccextractor is available");
            Ok(())
        } else {
            Err(CcscanError::Extractor("ccextractor version check failed".to_string()))
        }
    }
}
