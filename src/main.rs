#![windows_subsystem = "windows"]

/*!
Eye Saver, reminds you to look away from the screen every now and then.

Runs in the system tray, the reminder interval and the look away time are set from the tray menu.
 */
#[cfg(windows)]
extern crate native_windows_gui as nwg;

#[cfg(windows)]
fn run() -> eyesaver::error::Result<()> {
    use eyesaver::view::SystemTray;
    use nwg::NativeUi;

    let _ui = SystemTray::build_ui(Default::default())?;
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
        tracing::error!(error = %err, "Error in main loop");
        nwg::error_message("Error", &format!("Error in main loop: {}", err));
        std::process::exit(1);
    }

    // The settings window may still be running on its own thread
    std::process::exit(0);
}

#[cfg(not(windows))]
fn main() {
    if let Err(err) = eyesaver::logging::init("info") {
        eprintln!("{}", err);
    }
    tracing::error!("Eye Saver only runs on Windows");
    std::process::exit(1);
}
