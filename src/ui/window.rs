use std::path::PathBuf;

use gtk4::prelude::*;
use libadwaita::prelude::*;

use crate::app::{LogEntry, Session, UiEvent};

/// Handles returned from building the main window.
pub struct MainWindowWidgets {
    pub window: libadwaita::ApplicationWindow,
    pub import_button: gtk4::Button,
    pub process_button: gtk4::Button,
    pub export_button: gtk4::Button,
    pub import_label: gtk4::Label,
    pub processed_label: gtk4::Label,
    pub status_label: gtk4::Label,
    pub log_list: gtk4::ListBox,
    pub log_scroller: gtk4::ScrolledWindow,
}

fn path_row(title: &str) -> (libadwaita::ActionRow, gtk4::Label) {
    let row = libadwaita::ActionRow::builder().title(title).build();
    let label = gtk4::Label::new(Some("None"));
    label.add_css_class("dim-label");
    label.set_ellipsize(gtk4::pango::EllipsizeMode::Start);
    label.set_max_width_chars(40);
    row.add_suffix(&label);
    (row, label)
}

fn send_on_click(
    button: &gtk4::Button,
    sender: &async_channel::Sender<UiEvent>,
    event: fn() -> UiEvent,
) {
    let tx = sender.clone();
    button.connect_clicked(move |_| {
        let _ = tx.try_send(event());
    });
}

/// Build the main window. Button presses and drops are reported on `sender`.
pub fn build_main_window(
    app: &libadwaita::Application,
    sender: async_channel::Sender<UiEvent>,
) -> MainWindowWidgets {
    let window = libadwaita::ApplicationWindow::builder()
        .application(app)
        .title("Dissonance")
        .default_width(900)
        .default_height(740)
        .build();

    let toolbar_view = libadwaita::ToolbarView::new();
    let header = libadwaita::HeaderBar::new();
    toolbar_view.add_top_bar(&header);

    let content = gtk4::Box::new(gtk4::Orientation::Vertical, 12);
    content.set_margin_start(16);
    content.set_margin_end(16);
    content.set_margin_top(12);
    content.set_margin_bottom(12);

    // --- Actions ---
    let actions = gtk4::Box::new(gtk4::Orientation::Horizontal, 8);
    let import_button = gtk4::Button::with_label("Import Audio…");
    import_button.add_css_class("suggested-action");
    let process_button = gtk4::Button::with_label("Process");
    let export_button = gtk4::Button::with_label("Export…");
    process_button.set_sensitive(false);
    export_button.set_sensitive(false);
    actions.append(&import_button);
    actions.append(&process_button);
    actions.append(&export_button);
    content.append(&actions);

    send_on_click(&import_button, &sender, || UiEvent::ImportRequested);
    send_on_click(&process_button, &sender, || UiEvent::ProcessRequested);
    send_on_click(&export_button, &sender, || UiEvent::ExportRequested);

    // --- Files ---
    let files_group = libadwaita::PreferencesGroup::new();
    files_group.set_title("Files");
    files_group.set_description(Some("Drop an audio file anywhere in the window"));
    let (import_row, import_label) = path_row("Imported");
    let (processed_row, processed_label) = path_row("Processed");
    files_group.add(&import_row);
    files_group.add(&processed_row);
    content.append(&files_group);

    // --- Status ---
    let status_label = gtk4::Label::new(Some("Starting..."));
    status_label.set_xalign(0.0);
    status_label.add_css_class("heading");
    content.append(&status_label);

    // --- Log ---
    let log_list = gtk4::ListBox::new();
    log_list.set_selection_mode(gtk4::SelectionMode::None);
    log_list.add_css_class("boxed-list");
    let log_scroller = gtk4::ScrolledWindow::builder()
        .hscrollbar_policy(gtk4::PolicyType::Never)
        .vexpand(true)
        .child(&log_list)
        .build();
    content.append(&log_scroller);

    toolbar_view.set_content(Some(&content));
    window.set_content(Some(&toolbar_view));

    attach_drop_target(&window, sender);

    MainWindowWidgets {
        window,
        import_button,
        process_button,
        export_button,
        import_label,
        processed_label,
        status_label,
        log_list,
        log_scroller,
    }
}

/// Accept files dropped on the window.
fn attach_drop_target(window: &libadwaita::ApplicationWindow, sender: async_channel::Sender<UiEvent>) {
    let target = gtk4::DropTarget::new(
        gtk4::gdk::FileList::static_type(),
        gtk4::gdk::DragAction::COPY,
    );
    target.connect_drop(move |_, value, _, _| {
        let Ok(list) = value.get::<gtk4::gdk::FileList>() else {
            return false;
        };
        let paths: Vec<PathBuf> = list.files().iter().filter_map(|f| f.path()).collect();
        if paths.is_empty() {
            return false;
        }
        let _ = sender.try_send(UiEvent::FilesDropped(paths));
        true
    });
    window.add_controller(target);
}

fn show_path(label: &gtk4::Label, path: Option<&std::path::Path>) {
    match path {
        Some(p) => {
            let text = p.display().to_string();
            label.set_text(&text);
            label.set_tooltip_text(Some(&text));
        }
        None => {
            label.set_text("None");
            label.set_tooltip_text(None);
        }
    }
}

/// Sync labels and button sensitivity with the session.
pub fn refresh(widgets: &MainWindowWidgets, session: &Session) {
    show_path(&widgets.import_label, session.import_path.as_deref());
    show_path(&widgets.processed_label, session.processed_path.as_deref());
    widgets.import_button.set_sensitive(session.can_import());
    widgets.process_button.set_sensitive(session.can_process());
    widgets.export_button.set_sensitive(session.can_export());

    widgets.status_label.set_text(&session.status_line);
    if session.status_is_error {
        widgets.status_label.add_css_class("error");
    } else {
        widgets.status_label.remove_css_class("error");
    }
}

/// Append a log line and keep the view scrolled to the bottom.
pub fn show_log_entry(widgets: &MainWindowWidgets, entry: &LogEntry) {
    let label = gtk4::Label::new(Some(&entry.line()));
    label.set_xalign(0.0);
    label.set_wrap(true);
    label.set_selectable(true);
    label.set_margin_start(8);
    label.set_margin_end(8);
    label.set_margin_top(2);
    label.set_margin_bottom(2);
    label.add_css_class("monospace");
    if entry.is_error {
        label.add_css_class("error");
    }
    widgets.log_list.append(&label);

    let adjustment = widgets.log_scroller.vadjustment();
    adjustment.set_value(adjustment.upper());
}
