use thiserror::Error;

/// Errors raised while loading, validating or saving the reminder settings
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Failed to access the settings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse the settings file: {0}")]
    Parse(#[from] serde_json::Error),

    /// The file parsed, but some values had to be replaced with defaults
    #[error("{0}")]
    InvalidValue(String),

    /// Rejected input from the settings window
    #[error("{0}")]
    InvalidInput(String),
}

#[derive(Error, Debug)]
pub enum AppError {
    #[cfg(windows)]
    #[error("GUI error: {0}")]
    Gui(#[from] nwg::NwgError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Failed to set up logging: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, AppError>;
