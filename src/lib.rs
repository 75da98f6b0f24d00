#[cfg(windows)]
extern crate native_windows_gui as nwg;

pub mod controller;
pub mod error;
pub mod logging;
pub mod media;
pub mod scheduler;
pub mod settings;
pub mod settings_path;
pub mod timer;

#[cfg(windows)]
pub mod media_backend;
#[cfg(windows)]
pub mod media_tray;
#[cfg(windows)]
pub mod popup;
#[cfg(windows)]
pub mod settings_dialog;
#[cfg(windows)]
pub mod view;
