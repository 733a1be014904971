use std::cell::RefCell;
use std::rc::Rc;

use gtk4::glib;

use super::actions::{
    append_log, dispatch_export, dispatch_process, import_file, pick_import_file, refresh_window,
};
use super::state::{AppState, UiEvent};
use crate::export::ExportError;
use crate::job::JobError;
use crate::ui::dialogs::choose_export_destination;
use crate::ui::window::{refresh, show_log_entry};

/// Handle a UI event. This is the core state machine.
pub fn handle_ui_event(state: &Rc<RefCell<AppState>>, event: UiEvent) {
    match event {
        UiEvent::ImportRequested => pick_import_file(state),
        UiEvent::FileImported(path) => import_file(state, path),
        UiEvent::FilesDropped(paths) => {
            let mut paths = paths.into_iter();
            if let Some(first) = paths.next() {
                if paths.next().is_some() {
                    append_log(state, "Only the first dropped file is imported", false);
                }
                import_file(state, first);
            }
        }
        UiEvent::ProcessRequested => dispatch_process(state),
        UiEvent::ProcessFinished(result) => {
            match result {
                Ok(processed) => {
                    log::info!("Job finished: {}", processed.display());
                    state.borrow_mut().session.finish_job(Some(processed));
                }
                // Already reported by the job's error event.
                Err(JobError::Backend(e)) => {
                    log::error!("Process failed: {e}");
                    state.borrow_mut().session.finish_job(None);
                }
                Err(e) => {
                    log::error!("Process failed: {e}");
                    state.borrow_mut().session.finish_job(None);
                    append_log(state, format!("ERROR: {e}"), true);
                }
            }
            refresh_window(state);
        }
        UiEvent::ExportRequested => dispatch_export(state),
        UiEvent::ChooseExportDestination { request, reply } => {
            let window = state.borrow().window.as_ref().map(|w| w.window.clone());
            glib::spawn_future_local(async move {
                let dest = match window {
                    Some(window) => choose_export_destination(&window, &request).await,
                    None => None,
                };
                let _ = reply.send(dest).await;
            });
        }
        UiEvent::ExportFinished(result) => {
            state.borrow_mut().session.finish_export();
            match result {
                Ok(dest) => log::info!("Export finished: {}", dest.display()),
                Err(ExportError::Canceled) => append_log(state, "Export canceled", false),
                Err(e) => {
                    log::error!("Export failed: {e}");
                    append_log(state, format!("ERROR: {e}"), true);
                }
            }
            refresh_window(state);
        }
        UiEvent::Status(event) => {
            let mut s = state.borrow_mut();
            let entry = s.session.record_event(&event);
            if let Some(ref window) = s.window {
                show_log_entry(window, &entry);
                refresh(window, &s.session);
            }
        }
    }
}
