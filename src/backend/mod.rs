//! Processing backends.
//!
//! A backend turns a source file into a processed file and reports progress
//! through a [`StatusObserver`]. Which backend runs is decided once at startup
//! by [`Backend::select`].

mod native;
mod simulated;

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::Config;
use crate::files::default_work_dir;
use crate::status::StatusObserver;

pub use native::NativeCore;
pub use simulated::SimulatedCore;

/// Free-form options forwarded to the core with each job.
pub type JobOptions = serde_json::Map<String, serde_json::Value>;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to encode options: {0}")]
    Options(#[from] serde_json::Error),
    #[error("dissonance core reported an error: {0}")]
    Reported(String),
    #[error("dissonance core exited with {0}")]
    Exit(std::process::ExitStatus),
    #[error("dissonance core finished without a processed path")]
    MissingResult,
}

impl CoreError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        CoreError::Io {
            context: context.into(),
            source,
        }
    }
}

/// The processing core in use for this session.
pub enum Backend {
    Native(NativeCore),
    Simulated(SimulatedCore),
}

impl Backend {
    /// Use the native core when it can be found, otherwise fall back to the
    /// simulated one. The fallback is not an error.
    pub fn select(config: &Config) -> Self {
        if let Some(native) = config.native_core.as_ref().and_then(NativeCore::locate) {
            log::info!("dissonance core loaded: {}", native.program().display());
            return Backend::Native(native);
        }
        let simulated = Self::simulated(config);
        log::info!(
            "dissonance core not available, using simulated core in {}",
            simulated.work_dir().display()
        );
        Backend::Simulated(simulated)
    }

    pub fn simulated(config: &Config) -> SimulatedCore {
        let work_dir = config.work_dir.clone().unwrap_or_else(default_work_dir);
        SimulatedCore::new(work_dir, config.step_delay())
    }

    pub fn name(&self) -> &'static str {
        match self {
            Backend::Native(_) => "native",
            Backend::Simulated(_) => "simulated",
        }
    }

    /// Run one file through the core. Intermediate phases (`sending`,
    /// `processing`, progress) go to `observer`; terminal events are left to
    /// the caller.
    pub async fn process(
        &self,
        source: &Path,
        options: &JobOptions,
        observer: &dyn StatusObserver,
    ) -> Result<PathBuf, CoreError> {
        match self {
            Backend::Native(core) => core.process(source, options, observer).await,
            Backend::Simulated(core) => core.process(source, observer).await,
        }
    }
}
