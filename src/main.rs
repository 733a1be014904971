mod app;
mod backend;
mod config;
mod export;
mod files;
mod job;
mod status;
mod ui;

use std::cell::{OnceCell, RefCell};
use std::rc::Rc;

use gtk4::prelude::*;
use gtk4::{gio, glib};

use app::{AppState, UiEvent};
use config::Config;

type SharedState = Rc<RefCell<AppState>>;

fn main() -> glib::ExitCode {
    env_logger::init();
    log::info!("Dissonance starting");

    let application = libadwaita::Application::builder()
        .application_id("io.github.dissonance.Dissonance")
        .flags(gio::ApplicationFlags::HANDLES_OPEN)
        .build();

    // GApplication is single-instance: a second launch re-activates this one.
    let slot: Rc<OnceCell<SharedState>> = Rc::new(OnceCell::new());
    {
        let slot = slot.clone();
        application.connect_activate(move |app| {
            let state = slot.get_or_init(|| build_app(app));
            present(state);
        });
    }
    {
        let slot = slot.clone();
        application.connect_open(move |app, files, _hint| {
            let state = slot.get_or_init(|| build_app(app));
            present(state);
            let mut paths = files.iter().filter_map(|f| f.path());
            if let Some(first) = paths.next() {
                let sender = state.borrow().ui_sender.clone();
                let event = if paths.next().is_some() {
                    UiEvent::FilesDropped(files.iter().filter_map(|f| f.path()).collect())
                } else {
                    UiEvent::FileImported(first)
                };
                let _ = sender.try_send(event);
            }
        });
    }

    application.run()
}

fn present(state: &SharedState) {
    if let Some(ref window) = state.borrow().window {
        window.window.present();
    }
}

fn build_app(app: &libadwaita::Application) -> SharedState {
    let config = Config::load();
    if !Config::exists() {
        if let Err(e) = config.save() {
            log::warn!("Failed to save config: {e}");
        }
    }

    // UI events from buttons, drops, and background tasks
    let (ui_tx, ui_rx) = async_channel::unbounded::<UiEvent>();
    let state = Rc::new(RefCell::new(AppState::new(ui_tx.clone(), config)));

    let widgets = ui::window::build_main_window(app, ui_tx.clone());

    // Drop the status subscription when the window goes away
    {
        let state_clone = state.clone();
        widgets.window.connect_close_request(move |_| {
            if let Some(subscription) = state_clone.borrow_mut().status_subscription.take() {
                subscription.unsubscribe();
            }
            glib::Propagation::Proceed
        });
    }

    state.borrow_mut().window = Some(widgets);

    // Forward status events into the UI event stream
    {
        let (subscription, status_rx) = state.borrow().status.subscribe();
        state.borrow_mut().status_subscription = Some(subscription);
        let sender = ui_tx;
        glib::spawn_future_local(async move {
            while let Ok(event) = status_rx.recv().await {
                let _ = sender.send(UiEvent::Status(event)).await;
            }
        });
    }

    // Attach UI event handler
    {
        let state_clone = state.clone();
        glib::spawn_future_local(async move {
            while let Ok(event) = ui_rx.recv().await {
                app::handle_ui_event(&state_clone, event);
            }
        });
    }

    let backend = state.borrow().jobs.backend().name();
    app::append_log(&state, format!("Ready ({backend} core)"), false);
    app::refresh_window(&state);
    state
}
