use std::path::PathBuf;
use lazy_static::lazy_static;

pub const FILE_NAME: &str = "eye_saver_settings.json";

lazy_static! {
    static ref SETTINGS_PATH: PathBuf = exe_settings_path();
}

/// eye_saver_settings.json path, next to the exe so that the app stays portable
pub fn settings_path() -> &'static PathBuf {
    &SETTINGS_PATH
}

/// Returns the settings path next to the executable, or the working directory as a fallback
fn exe_settings_path() -> PathBuf {
    return std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(|d| d.join(FILE_NAME)))
        .unwrap_or_else(|| PathBuf::from(FILE_NAME));
}
