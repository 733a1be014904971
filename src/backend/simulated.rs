use std::path::{Path, PathBuf};
use std::time::Duration;

use super::CoreError;
use crate::files::derived_file_name;
use crate::status::{StatusEvent, StatusObserver};

const PROGRESS_STEPS: [u8; 4] = [10, 40, 70, 100];

/// Stand-in used when no native core is installed. Walks through the same
/// phases as the real core with fixed delays, then copies the source file.
pub struct SimulatedCore {
    work_dir: PathBuf,
    step_delay: Duration,
}

impl SimulatedCore {
    pub fn new(work_dir: PathBuf, step_delay: Duration) -> Self {
        Self {
            work_dir,
            step_delay,
        }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    pub async fn process(
        &self,
        source: &Path,
        observer: &dyn StatusObserver,
    ) -> Result<PathBuf, CoreError> {
        observer.notify(StatusEvent::sending(
            "Sending to dissonance-core (simulated)...",
        ));
        tokio::time::sleep(self.step_delay).await;

        observer.notify(StatusEvent::processing("Processing started"));
        for percent in PROGRESS_STEPS {
            tokio::time::sleep(self.step_delay).await;
            observer.notify(StatusEvent::progress(
                percent,
                format!("Processing: {percent}%"),
            ));
        }

        // Created on first use and left in place afterwards.
        tokio::fs::create_dir_all(&self.work_dir)
            .await
            .map_err(|e| {
                CoreError::io(format!("creating {}", self.work_dir.display()), e)
            })?;

        let processed = self.work_dir.join(derived_file_name(source));
        tokio::fs::copy(source, &processed).await.map_err(|e| {
            CoreError::io(format!("copying {}", source.display()), e)
        })?;

        log::info!("Simulated core wrote {}", processed.display());
        Ok(processed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::status::tests::Recorder;
    use crate::status::StatusKind;

    fn core(work_dir: &Path) -> SimulatedCore {
        SimulatedCore::new(work_dir.join("dissonance"), Duration::from_millis(1))
    }

    #[tokio::test]
    async fn copies_source_byte_for_byte() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wav");
        let bytes: Vec<u8> = (0..=255u8).cycle().take(4096).collect();
        std::fs::write(&source, &bytes).unwrap();

        let recorder = Recorder::default();
        let processed = core(dir.path()).process(&source, &recorder).await.unwrap();

        assert_eq!(processed, dir.path().join("dissonance").join("a-processed.wav"));
        assert_eq!(std::fs::read(&processed).unwrap(), bytes);
    }

    #[tokio::test]
    async fn reports_phases_and_progress() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a.wav");
        std::fs::write(&source, b"RIFF").unwrap();

        let recorder = Recorder::default();
        core(dir.path()).process(&source, &recorder).await.unwrap();

        use StatusKind::*;
        assert_eq!(
            recorder.statuses(),
            [Sending, Processing, Processing, Processing, Processing, Processing]
        );
        let events = recorder.events.lock().unwrap();
        let progress: Vec<u8> = events.iter().filter_map(|e| e.progress).collect();
        assert_eq!(progress, PROGRESS_STEPS);
        assert_eq!(events[2].message, "Processing: 10%");
    }

    #[tokio::test]
    async fn extensionless_source_gets_wav() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("a");
        std::fs::write(&source, b"data").unwrap();

        let processed = core(dir.path())
            .process(&source, &Recorder::default())
            .await
            .unwrap();
        assert_eq!(processed.file_name().unwrap(), "a-processed.wav");
    }

    #[tokio::test]
    async fn missing_source_is_an_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = core(dir.path())
            .process(&dir.path().join("gone.wav"), &Recorder::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CoreError::Io { .. }));
    }
}
