use std::future::Future;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::files::{base_name, AUDIO_EXTENSIONS};
use crate::status::{StatusChannel, StatusEvent};

/// Copy a processed file out. Without a destination the user is asked for one.
#[derive(Debug, Clone, Default)]
pub struct ExportRequest {
    pub processed_path: Option<PathBuf>,
    pub dest_path: Option<PathBuf>,
}

impl ExportRequest {
    pub fn new(processed_path: PathBuf, dest_path: Option<PathBuf>) -> Self {
        Self {
            processed_path: Some(processed_path),
            dest_path,
        }
    }
}

impl From<PathBuf> for ExportRequest {
    fn from(processed_path: PathBuf) -> Self {
        Self::new(processed_path, None)
    }
}

/// What the save dialog should look like.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveDialogRequest {
    pub title: String,
    pub initial_name: String,
    pub extensions: &'static [&'static str],
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("No processed file path")]
    MissingInput,
    #[error("No main window")]
    NoTarget,
    #[error("Export canceled")]
    Canceled,
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

/// Whether both paths name the same existing file.
async fn same_file(a: &Path, b: &Path) -> bool {
    match (tokio::fs::canonicalize(a).await, tokio::fs::canonicalize(b).await) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

pub struct ExportOrchestrator {
    status: StatusChannel,
}

impl ExportOrchestrator {
    pub fn new(status: StatusChannel) -> Self {
        Self { status }
    }

    /// Export a processed file. `choose_destination` is only consulted when the
    /// request has no destination; returning `None` cancels the export.
    pub async fn export<P, F>(
        &self,
        request: impl Into<ExportRequest>,
        choose_destination: P,
    ) -> Result<PathBuf, ExportError>
    where
        P: FnOnce(SaveDialogRequest) -> F,
        F: Future<Output = Option<PathBuf>>,
    {
        let ExportRequest {
            processed_path,
            dest_path,
        } = request.into();

        let Some(processed) = processed_path.filter(|p| !p.as_os_str().is_empty()) else {
            return Err(ExportError::MissingInput);
        };
        if !self.status.has_listeners() {
            return Err(ExportError::NoTarget);
        }

        let dest = match dest_path {
            Some(dest) => Some(dest),
            None => {
                choose_destination(SaveDialogRequest {
                    title: "Export processed file".into(),
                    initial_name: base_name(&processed),
                    extensions: &AUDIO_EXTENSIONS,
                })
                .await
            }
        };
        let Some(dest) = dest.filter(|p| !p.as_os_str().is_empty()) else {
            log::info!("Export of {} canceled", processed.display());
            return Err(ExportError::Canceled);
        };

        // Copying a file onto itself would truncate it.
        if same_file(&processed, &dest).await {
            log::info!("{} is already at the destination", processed.display());
        } else if let Err(e) = tokio::fs::copy(&processed, &dest).await {
            log::error!("Export error: {e}");
            self.status
                .emit(StatusEvent::error("Export failed", e.to_string()));
            return Err(e.into());
        }

        log::info!("Exported {} to {}", processed.display(), dest.display());
        self.status.emit(StatusEvent::exported(dest.clone()));
        Ok(dest)
    }
}
