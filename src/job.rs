//! Job lifecycle: import → send → process → processed | error.

use std::path::PathBuf;
use std::sync::Mutex;

use thiserror::Error;

use crate::backend::{Backend, CoreError, JobOptions};
use crate::files::base_name;
use crate::status::{StatusChannel, StatusEvent, StatusKind, StatusObserver};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    Idle,
    Imported,
    Sending,
    Processing,
    Processed,
    Error,
}

impl JobState {
    /// State reached after observing `status`, or `None` if the event doesn't
    /// move the job.
    fn after(self, status: StatusKind) -> Option<JobState> {
        match (self, status) {
            (JobState::Imported, StatusKind::Sending) => Some(JobState::Sending),
            (JobState::Imported | JobState::Sending, StatusKind::Processing) => {
                Some(JobState::Processing)
            }
            _ => None,
        }
    }
}

/// The job currently owned by the orchestrator.
#[derive(Debug, Clone)]
pub struct Job {
    pub source_path: PathBuf,
    pub options: JobOptions,
    pub state: JobState,
    pub processed_path: Option<PathBuf>,
    pub error: Option<String>,
}

/// What the UI asks to process. A bare path converts into a request with no
/// options.
#[derive(Debug, Clone, Default)]
pub struct ProcessRequest {
    pub file_path: Option<PathBuf>,
    pub options: JobOptions,
}

impl ProcessRequest {
    pub fn new(file_path: PathBuf, options: JobOptions) -> Self {
        Self {
            file_path: Some(file_path),
            options,
        }
    }
}

impl From<PathBuf> for ProcessRequest {
    fn from(file_path: PathBuf) -> Self {
        Self::new(file_path, JobOptions::new())
    }
}

#[derive(Debug, Error)]
pub enum JobError {
    #[error("No main window")]
    NoTarget,
    #[error("No file path provided")]
    MissingInput,
    #[error("A job is already in progress")]
    Busy,
    #[error(transparent)]
    Backend(#[from] CoreError),
}

/// Sequences one job at a time through the backend and reports every
/// transition on the status channel.
pub struct JobOrchestrator {
    backend: Backend,
    status: StatusChannel,
    current: Mutex<Option<Job>>,
}

/// Clears the job slot when the job ends, however it ends.
struct JobSlot<'a> {
    current: &'a Mutex<Option<Job>>,
}

impl Drop for JobSlot<'_> {
    fn drop(&mut self) {
        let Some(job) = self.current.lock().unwrap().take() else {
            return;
        };
        match (job.state, &job.processed_path, &job.error) {
            (JobState::Processed, Some(processed), _) => log::debug!(
                "Job for {} finished: {}",
                job.source_path.display(),
                processed.display()
            ),
            (_, _, Some(error)) => log::debug!(
                "Job for {} failed: {error}",
                job.source_path.display()
            ),
            (state, _, _) => log::debug!(
                "Job for {} released in state {state:?}",
                job.source_path.display()
            ),
        }
    }
}

/// Observer handed to the backend for the duration of one job.
struct JobObserver<'a> {
    orchestrator: &'a JobOrchestrator,
}

impl StatusObserver for JobObserver<'_> {
    fn notify(&self, event: StatusEvent) {
        // The orchestrator owns the terminal event.
        if event.status.is_terminal() {
            log::warn!("Dropping {:?} event from the backend", event.status);
            return;
        }
        self.orchestrator.update(|job| {
            if let Some(next) = job.state.after(event.status) {
                job.state = next;
            }
        });
        self.orchestrator.status.emit(event);
    }
}

impl JobOrchestrator {
    pub fn new(backend: Backend, status: StatusChannel) -> Self {
        Self {
            backend,
            status,
            current: Mutex::new(None),
        }
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Snapshot of the in-flight job, if any.
    #[cfg(test)]
    pub fn current_job(&self) -> Option<Job> {
        self.current.lock().unwrap().clone()
    }

    pub fn state(&self) -> JobState {
        self.current
            .lock()
            .unwrap()
            .as_ref()
            .map_or(JobState::Idle, |job| job.state)
    }

    fn update(&self, f: impl FnOnce(&mut Job)) {
        if let Some(job) = self.current.lock().unwrap().as_mut() {
            f(job);
        }
    }

    /// Claim the job slot, or fail with `Busy` if another job holds it.
    fn claim(&self, job: Job) -> Result<JobSlot<'_>, JobError> {
        let mut current = self.current.lock().unwrap();
        if current.is_some() {
            return Err(JobError::Busy);
        }
        log::debug!(
            "Starting job for {} with {} option(s)",
            job.source_path.display(),
            job.options.len()
        );
        *current = Some(job);
        Ok(JobSlot {
            current: &self.current,
        })
    }

    /// Run a job to completion. Failures come back as `Err`; once the job has
    /// started, an `error` event is emitted before returning.
    pub async fn process(&self, request: impl Into<ProcessRequest>) -> Result<PathBuf, JobError> {
        let ProcessRequest { file_path, options } = request.into();
        log::info!("process requested: {file_path:?}");

        if !self.status.has_listeners() {
            log::warn!("No status listener attached, refusing to process");
            return Err(JobError::NoTarget);
        }
        let Some(source) = file_path.filter(|p| !p.as_os_str().is_empty()) else {
            return Err(JobError::MissingInput);
        };

        let _slot = self
            .claim(Job {
                source_path: source.clone(),
                options: options.clone(),
                state: JobState::Imported,
                processed_path: None,
                error: None,
            })
            .inspect_err(|_| log::warn!("Rejected {}: a job is in flight", source.display()))?;

        self.status.emit(StatusEvent::imported(format!(
            "File imported: {}",
            base_name(&source)
        )));

        let observer = JobObserver { orchestrator: self };
        let result = self
            .backend
            .process(&source, &options, &observer)
            .await
            .and_then(|processed| {
                if processed.as_os_str().is_empty() {
                    Err(CoreError::MissingResult)
                } else {
                    Ok(processed)
                }
            });

        match result {
            Ok(processed) => {
                log::info!("Processed {} -> {}", source.display(), processed.display());
                self.update(|job| {
                    job.state = JobState::Processed;
                    job.processed_path = Some(processed.clone());
                });
                self.status.emit(StatusEvent::processed(processed.clone()));
                Ok(processed)
            }
            Err(e) => {
                log::error!("{} core processing error: {e}", self.backend.name());
                self.update(|job| {
                    job.state = JobState::Error;
                    job.error = Some(e.to_string());
                });
                self.status
                    .emit(StatusEvent::error("Processing failed", e.to_string()));
                Err(JobError::Backend(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SimulatedCore;
    use crate::status::tests::drain;
    use std::path::Path;
    use std::time::Duration;

    fn orchestrator(work_dir: &Path) -> (JobOrchestrator, StatusChannel) {
        let status = StatusChannel::new();
        let backend = Backend::Simulated(SimulatedCore::new(
            work_dir.join("dissonance"),
            Duration::from_millis(1),
        ));
        (JobOrchestrator::new(backend, status.clone()), status)
    }

    fn terminal(events: &[StatusEvent]) -> Vec<&StatusEvent> {
        events.iter().filter(|e| e.status.is_terminal()).collect()
    }

    #[tokio::test]
    async fn imported_file_is_processed() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wav");
        std::fs::write(&source, b"RIFF....WAVE").unwrap();
        let (jobs, status) = orchestrator(dir.path());
        let (_sub, rx) = status.subscribe();

        let processed = jobs.process(source.clone()).await.unwrap();

        let expected = dir.path().join("dissonance").join("a-processed.wav");
        assert_eq!(processed, expected);
        assert_eq!(std::fs::read(&expected).unwrap(), b"RIFF....WAVE");

        let events = drain(&rx);
        use StatusKind::*;
        let statuses: Vec<StatusKind> = events.iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            [Imported, Sending, Processing, Processing, Processing, Processing, Processing, Processed]
        );
        let last = events.last().unwrap();
        assert_eq!(last.processed_path.as_deref(), Some(expected.as_path()));
        assert_eq!(terminal(&events).len(), 1);
        assert!(jobs.current_job().is_none());
        assert_eq!(jobs.state(), JobState::Idle);
    }

    #[tokio::test]
    async fn missing_path_emits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let (jobs, status) = orchestrator(dir.path());
        let (_sub, rx) = status.subscribe();

        let err = jobs.process(ProcessRequest::default()).await.unwrap_err();

        assert_eq!(err.to_string(), "No file path provided");
        assert!(drain(&rx).is_empty());
    }

    #[tokio::test]
    async fn no_listener_is_no_target() {
        let dir = tempfile::tempdir().unwrap();
        let (jobs, _status) = orchestrator(dir.path());
        let err = jobs.process(dir.path().join("a.wav")).await.unwrap_err();
        assert!(matches!(err, JobError::NoTarget));
    }

    #[tokio::test]
    async fn backend_failure_ends_in_one_error_event() {
        let dir = tempfile::tempdir().unwrap();
        let (jobs, status) = orchestrator(dir.path());
        let (_sub, rx) = status.subscribe();

        let err = jobs.process(dir.path().join("missing.wav")).await.unwrap_err();
        assert!(matches!(err, JobError::Backend(CoreError::Io { .. })));

        let events = drain(&rx);
        let terminal = terminal(&events);
        assert_eq!(terminal.len(), 1);
        let last = events.last().unwrap();
        assert_eq!(last.status, StatusKind::Error);
        assert_eq!(last.message, "Processing failed");
        assert_eq!(last.error.as_deref(), Some(err.to_string().as_str()));
        assert!(jobs.current_job().is_none());
    }

    #[tokio::test]
    async fn overlapping_request_is_busy() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.wav");
        let second = dir.path().join("second.wav");
        std::fs::write(&first, b"1").unwrap();
        std::fs::write(&second, b"2").unwrap();
        let (jobs, status) = orchestrator(dir.path());
        let (_sub, rx) = status.subscribe();

        let (a, b) = tokio::join!(jobs.process(first), jobs.process(second));

        assert!(a.is_ok());
        assert!(matches!(b, Err(JobError::Busy)));
        let imported: Vec<String> = drain(&rx)
            .into_iter()
            .filter(|e| e.status == StatusKind::Imported)
            .map(|e| e.message)
            .collect();
        assert_eq!(imported, ["File imported: first.wav"]);
    }

    #[tokio::test]
    async fn slot_is_free_after_a_job() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wav");
        std::fs::write(&source, b"x").unwrap();
        let (jobs, status) = orchestrator(dir.path());
        let (_sub, _rx) = status.subscribe();

        jobs.process(source.clone()).await.unwrap();
        jobs.process(source).await.unwrap();
    }

    #[tokio::test]
    async fn backend_cannot_end_the_job() {
        let dir = tempfile::tempdir().unwrap();
        let (jobs, status) = orchestrator(dir.path());
        let (_sub, rx) = status.subscribe();
        let _slot = jobs
            .claim(Job {
                source_path: dir.path().join("a.wav"),
                options: JobOptions::new(),
                state: JobState::Imported,
                processed_path: None,
                error: None,
            })
            .unwrap();
        let observer = JobObserver { orchestrator: &jobs };

        observer.notify(StatusEvent::sending("Sending to core"));
        observer.notify(StatusEvent::processed(dir.path().join("early.wav")));
        observer.notify(StatusEvent::error("Processing failed", "from core"));

        let events = drain(&rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, StatusKind::Sending);
        let job = jobs.current_job().unwrap();
        assert_eq!(job.state, JobState::Sending);
        assert!(job.processed_path.is_none());
    }

    #[test]
    fn state_follows_backend_phases() {
        assert_eq!(
            JobState::Imported.after(StatusKind::Sending),
            Some(JobState::Sending)
        );
        assert_eq!(
            JobState::Sending.after(StatusKind::Processing),
            Some(JobState::Processing)
        );
        assert_eq!(JobState::Processing.after(StatusKind::Processing), None);
        assert_eq!(JobState::Processed.after(StatusKind::Sending), None);
    }

    #[test]
    fn bare_path_has_no_options() {
        let request = ProcessRequest::from(PathBuf::from("/tmp/a.wav"));
        assert_eq!(request.file_path.as_deref(), Some(Path::new("/tmp/a.wav")));
        assert!(request.options.is_empty());
    }
}
