use std::path::PathBuf;
use std::sync::Arc;

use crate::backend::Backend;
use crate::config::Config;
use crate::export::{ExportError, ExportOrchestrator, SaveDialogRequest};
use crate::job::{JobError, JobOrchestrator};
use crate::status::{StatusChannel, StatusEvent, Subscription};
use crate::ui::window::MainWindowWidgets;

/// Events delivered to the GTK main thread.
#[derive(Debug)]
pub enum UiEvent {
    ImportRequested,
    FileImported(PathBuf),
    FilesDropped(Vec<PathBuf>),
    ProcessRequested,
    ProcessFinished(Result<PathBuf, JobError>),
    ExportRequested,
    ChooseExportDestination {
        request: SaveDialogRequest,
        reply: async_channel::Sender<Option<PathBuf>>,
    },
    ExportFinished(Result<PathBuf, ExportError>),
    Status(StatusEvent),
}

/// One line of the session log.
#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub timestamp: String,
    pub text: String,
    pub is_error: bool,
}

impl LogEntry {
    fn now(text: String, is_error: bool) -> Self {
        Self {
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
            text,
            is_error,
        }
    }

    pub fn line(&self) -> String {
        format!("[{}] {}", self.timestamp, self.text)
    }
}

/// Background work the session is waiting on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Work {
    Job,
    Export,
}

/// What the window shows, independent of the widgets.
#[derive(Debug, Default)]
pub struct Session {
    pub import_path: Option<PathBuf>,
    pub processed_path: Option<PathBuf>,
    pub busy: Option<Work>,
    pub log: Vec<LogEntry>,
    pub status_line: String,
    pub status_is_error: bool,
}

impl Session {
    /// Make `path` the current file. A new import always drops the previous
    /// processed result. Refused while a job or export runs.
    pub fn import(&mut self, path: PathBuf) -> bool {
        if self.busy.is_some() {
            return false;
        }
        self.import_path = Some(path);
        self.processed_path = None;
        true
    }

    pub fn can_import(&self) -> bool {
        self.busy.is_none()
    }

    pub fn can_process(&self) -> bool {
        self.import_path.is_some() && self.busy.is_none()
    }

    pub fn can_export(&self) -> bool {
        self.processed_path.is_some() && self.busy.is_none()
    }

    pub fn begin_job(&mut self) {
        self.busy = Some(Work::Job);
    }

    pub fn begin_export(&mut self) {
        self.busy = Some(Work::Export);
    }

    /// End the running job; `processed` is its output when it succeeded.
    /// The terminal status event and the job's own result both end it, so
    /// whichever arrives second is a no-op. Returns whether a job was running.
    pub fn finish_job(&mut self, processed: Option<PathBuf>) -> bool {
        if self.busy != Some(Work::Job) {
            return false;
        }
        self.busy = None;
        if processed.is_some() {
            self.processed_path = processed;
        }
        true
    }

    pub fn finish_export(&mut self) {
        if self.busy == Some(Work::Export) {
            self.busy = None;
        }
    }

    /// Append a status event to the log and make it the status line. A
    /// terminal event ends the running job.
    pub fn record_event(&mut self, event: &StatusEvent) -> LogEntry {
        if event.status.is_terminal() {
            self.finish_job(event.processed_path.clone());
        }
        self.log_message(event.display_text(), event.is_error())
    }

    pub fn log_message(&mut self, text: impl Into<String>, is_error: bool) -> LogEntry {
        let entry = LogEntry::now(text.into(), is_error);
        self.status_line = entry.text.clone();
        self.status_is_error = is_error;
        self.log.push(entry.clone());
        entry
    }
}

/// Central application state. Lives on the GTK main thread inside Rc<RefCell<>>.
pub struct AppState {
    pub session: Session,
    pub config: Config,
    pub tokio_rt: tokio::runtime::Runtime,
    pub status: StatusChannel,
    pub jobs: Arc<JobOrchestrator>,
    pub exporter: Arc<ExportOrchestrator>,
    pub ui_sender: async_channel::Sender<UiEvent>,
    pub status_subscription: Option<Subscription>,

    // UI handles
    pub window: Option<MainWindowWidgets>,
}

impl AppState {
    pub fn new(sender: async_channel::Sender<UiEvent>, config: Config) -> Self {
        let tokio_rt = tokio::runtime::Runtime::new()
            .expect("Failed to create tokio runtime");
        let status = StatusChannel::new();
        let backend = Backend::select(&config);
        let jobs = Arc::new(JobOrchestrator::new(backend, status.clone()));
        let exporter = Arc::new(ExportOrchestrator::new(status.clone()));

        Self {
            session: Session::default(),
            config,
            tokio_rt,
            status,
            jobs,
            exporter,
            ui_sender: sender,
            status_subscription: None,
            window: None,
        }
    }
}
