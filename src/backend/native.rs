use std::path::{Path, PathBuf};
use std::process::Stdio;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

use super::{CoreError, JobOptions};
use crate::config::NativeCoreConfig;
use crate::status::{StatusEvent, StatusObserver};

/// One line of the core's stdout.
#[derive(Debug, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum CoreMessage {
    Progress {
        percent: f64,
        #[serde(default)]
        message: Option<String>,
    },
    Log {
        message: String,
    },
    Result {
        #[serde(rename = "processedPath")]
        processed_path: PathBuf,
    },
    Error {
        message: String,
    },
}

/// Anything that isn't a recognised message is passed on as a log line.
fn parse_line(line: &str) -> CoreMessage {
    serde_json::from_str(line).unwrap_or_else(|_| CoreMessage::Log {
        message: line.to_string(),
    })
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    std::fs::metadata(path)
        .map(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Resolve a program the way a shell would: paths are checked directly, bare
/// names are searched on `PATH`.
fn resolve_program(program: &Path) -> Option<PathBuf> {
    if program.components().count() > 1 {
        return is_executable(program).then(|| program.to_path_buf());
    }
    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

/// The external dissonance core, run as a child process.
///
/// Invoked as `<program> [args..] <source> <options-json>`. The core reports
/// on stdout with one JSON object per line (`progress`, `log`, `result`,
/// `error`).
pub struct NativeCore {
    program: PathBuf,
    args: Vec<String>,
}

impl NativeCore {
    /// Returns `None` when the configured program can't be found.
    pub fn locate(config: &NativeCoreConfig) -> Option<Self> {
        match resolve_program(&config.program) {
            Some(program) => Some(Self {
                program,
                args: config.args.clone(),
            }),
            None => {
                log::info!("dissonance core {} not found", config.program.display());
                None
            }
        }
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub async fn process(
        &self,
        source: &Path,
        options: &JobOptions,
        observer: &dyn StatusObserver,
    ) -> Result<PathBuf, CoreError> {
        observer.notify(StatusEvent::sending(
            "Sending to dissonance-core (native)...",
        ));
        let options_json = serde_json::to_string(options)?;

        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg(source)
            .arg(options_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| CoreError::io(format!("starting {}", self.program.display()), e))?;

        observer.notify(StatusEvent::processing("Processing started"));

        let stdout = child.stdout.take().ok_or_else(|| {
            CoreError::io(
                "reading core output",
                std::io::Error::other("stdout was not captured"),
            )
        })?;
        let mut lines = BufReader::new(stdout).lines();

        let mut processed = None;
        let mut reported = None;
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| CoreError::io("reading core output", e))?
        {
            let line = line.trim_end_matches('\r');
            if line.trim().is_empty() {
                continue;
            }
            match parse_line(line) {
                CoreMessage::Progress { percent, message } => {
                    let percent = percent.round().clamp(0.0, 100.0) as u8;
                    let message = message.unwrap_or_else(|| format!("Processing: {percent}%"));
                    observer.notify(StatusEvent::progress(percent, message));
                }
                CoreMessage::Log { message } => {
                    observer.notify(StatusEvent::processing(message));
                }
                CoreMessage::Result { processed_path } => processed = Some(processed_path),
                CoreMessage::Error { message } => reported = Some(message),
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| CoreError::io("waiting for core", e))?;

        if let Some(message) = reported {
            return Err(CoreError::Reported(message));
        }
        if !status.success() {
            return Err(CoreError::Exit(status));
        }
        processed
            .filter(|p| !p.as_os_str().is_empty())
            .ok_or(CoreError::MissingResult)
    }
}
