use std::path::PathBuf;

use gtk4::prelude::*;

use crate::export::SaveDialogRequest;
use crate::files::AUDIO_EXTENSIONS;

fn audio_filter(extensions: &[&str]) -> gtk4::FileFilter {
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Audio"));
    for ext in extensions {
        filter.add_suffix(ext);
    }
    filter
}

fn filter_list(filter: &gtk4::FileFilter) -> gtk4::gio::ListStore {
    let filters = gtk4::gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(filter);
    filters
}

/// Ask for a single audio file. `None` when the dialog is dismissed.
pub async fn choose_import_file(parent: &impl IsA<gtk4::Window>) -> Option<PathBuf> {
    let filter = audio_filter(&AUDIO_EXTENSIONS);
    let dialog = gtk4::FileDialog::builder()
        .title("Import audio file")
        .modal(true)
        .filters(&filter_list(&filter))
        .default_filter(&filter)
        .build();

    match dialog.open_future(Some(parent)).await {
        Ok(file) => file.path(),
        Err(e) => {
            log::info!("Import dialog closed: {e}");
            None
        }
    }
}

/// Ask where to export. `None` means the user canceled.
pub async fn choose_export_destination(
    parent: &impl IsA<gtk4::Window>,
    request: &SaveDialogRequest,
) -> Option<PathBuf> {
    let filter = audio_filter(request.extensions);
    let dialog = gtk4::FileDialog::builder()
        .title(request.title.as_str())
        .modal(true)
        .initial_name(request.initial_name.as_str())
        .filters(&filter_list(&filter))
        .default_filter(&filter)
        .build();

    match dialog.save_future(Some(parent)).await {
        Ok(file) => file.path(),
        Err(e) => {
            log::info!("Export dialog closed: {e}");
            None
        }
    }
}
