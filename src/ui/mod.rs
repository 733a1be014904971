pub mod dialogs;
pub mod window;
