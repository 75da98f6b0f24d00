#![windows_subsystem = "windows"]

//! Global hotkeys for the master volume and the media keys, lives in the system tray.
//!
//! ctrl+shift+up / down change the volume, ctrl+shift+left / right skip tracks and
//! ctrl+shift+space toggles play/pause.

#[cfg(windows)]
extern crate native_windows_gui as nwg;

#[cfg(windows)]
fn run() -> eyesaver::error::Result<()> {
    use eyesaver::media_tray::AudioTray;
    use nwg::NativeUi;

    let _ui = AudioTray::build_ui(Default::default())?;
    tracing::info!("Audio Controller running");
    nwg::dispatch_thread_events();
    return Ok(());
}

#[cfg(windows)]
fn main() {
    if let Err(err) = eyesaver::logging::init("info") {
        eprintln!("{}", err);
    }

    nwg::init().expect("Failed to init Native Windows GUI");

    if let Err(err) = run() {
        tracing::error!(error = %err, "Audio Controller failed");
        nwg::error_message("Error", &format!("Audio Controller failed: {}", err));
        std::process::exit(1);
    }
}

#[cfg(not(windows))]
fn main() {
    if let Err(err) = eyesaver::logging::init("info") {
        eprintln!("{}", err);
    }
    tracing::error!("The audio controller only runs on Windows");
    std::process::exit(1);
}
