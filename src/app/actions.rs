use std::cell::RefCell;
use std::path::PathBuf;
use std::rc::Rc;

use gtk4::glib;

use super::state::{AppState, UiEvent};
use crate::export::ExportRequest;
use crate::files;
use crate::job::ProcessRequest;
use crate::ui::dialogs::choose_import_file;
use crate::ui::window::{refresh, show_log_entry};

/// Add a line to the session log and show it.
pub fn append_log(state: &Rc<RefCell<AppState>>, text: impl Into<String>, is_error: bool) {
    let mut s = state.borrow_mut();
    let entry = s.session.log_message(text, is_error);
    if let Some(ref window) = s.window {
        show_log_entry(window, &entry);
        refresh(window, &s.session);
    }
}

pub fn refresh_window(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    if let Some(ref window) = s.window {
        refresh(window, &s.session);
    }
}

/// Show the open dialog; the chosen file comes back as `FileImported`.
pub fn pick_import_file(state: &Rc<RefCell<AppState>>) {
    let s = state.borrow();
    let Some(window) = s.window.as_ref().map(|w| w.window.clone()) else {
        return;
    };
    let sender = s.ui_sender.clone();
    glib::spawn_future_local(async move {
        match choose_import_file(&window).await {
            Some(path) => {
                let _ = sender.send(UiEvent::FileImported(path)).await;
            }
            None => log::info!("Import canceled"),
        }
    });
}

/// Single entry point for picked, dropped and command-line files.
pub fn import_file(state: &Rc<RefCell<AppState>>, path: PathBuf) {
    if !state.borrow_mut().session.import(path.clone()) {
        log::warn!("Ignoring import of {} while busy", path.display());
        append_log(state, "Busy: wait for the current job before importing", false);
        return;
    }
    log::info!("Imported {}", path.display());

    match files::file_stats(&path) {
        Some(stats) => {
            let modified = chrono::DateTime::from_timestamp_millis(stats.mtime_ms as i64)
                .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "unknown".into());
            append_log(
                state,
                format!(
                    "Imported {} ({} bytes, modified {modified})",
                    stats.name, stats.size
                ),
                false,
            );
        }
        None => append_log(state, format!("Could not read {}", path.display()), true),
    }
    if !files::has_audio_extension(&path) {
        append_log(state, "File extension is not a known audio type", false);
    }
    refresh_window(state);
}

/// Run the imported file through the core on the tokio runtime.
pub fn dispatch_process(state: &Rc<RefCell<AppState>>) {
    {
        let mut s = state.borrow_mut();
        if !s.session.can_process() {
            log::info!("Ignoring process request: nothing to process or busy");
            return;
        }
        let Some(path) = s.session.import_path.clone() else {
            return;
        };
        s.session.begin_job();

        let request = ProcessRequest::new(path, s.config.default_options.clone());
        let jobs = s.jobs.clone();
        let sender = s.ui_sender.clone();
        log::debug!("Dispatching job, orchestrator state {:?}", jobs.state());

        s.tokio_rt.spawn(async move {
            let result = jobs.process(request).await;
            let _ = sender.send(UiEvent::ProcessFinished(result)).await;
        });
    }
    refresh_window(state);
}

/// Export the processed file. The save dialog runs on the main thread and
/// its answer is sent back to the export task.
pub fn dispatch_export(state: &Rc<RefCell<AppState>>) {
    {
        let mut s = state.borrow_mut();
        if !s.session.can_export() {
            log::info!("Ignoring export request: nothing to export or busy");
            return;
        }
        let Some(processed) = s.session.processed_path.clone() else {
            return;
        };
        s.session.begin_export();

        let exporter = s.exporter.clone();
        let sender = s.ui_sender.clone();
        let dialog_sender = sender.clone();

        s.tokio_rt.spawn(async move {
            let result = exporter
                .export(ExportRequest::from(processed), move |request| async move {
                    let (reply, answer) = async_channel::bounded(1);
                    dialog_sender
                        .send(UiEvent::ChooseExportDestination { request, reply })
                        .await
                        .ok()?;
                    answer.recv().await.ok().flatten()
                })
                .await;
            let _ = sender.send(UiEvent::ExportFinished(result)).await;
        });
    }
    refresh_window(state);
}
