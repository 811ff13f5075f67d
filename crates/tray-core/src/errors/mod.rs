use std::error::Error;

/// Base trait for all tray errors
pub trait TrayError: Error + Send + Sync + 'static {
    /// Error code for programmatic handling
    fn error_code(&self) -> &'static str;

    /// Whether this error should be logged as an error or warning
    fn is_user_error(&self) -> bool {
        false
    }
}

/// Common result type for the tray
pub type TrayResult<T> = Result<T, Box<dyn TrayError>>;

impl TrayError for tray_config::ConfigError {
    fn error_code(&self) -> &'static str {
        match self {
            tray_config::ConfigError::ConfigParseError { .. } => "CONFIG_PARSE_ERROR",
            tray_config::ConfigError::InvalidConfiguration { .. } => "INVALID_CONFIGURATION",
            tray_config::ConfigError::IoError { .. } => "CONFIG_IO_ERROR",
        }
    }

    fn is_user_error(&self) -> bool {
        matches!(
            self,
            tray_config::ConfigError::ConfigParseError { .. }
                | tray_config::ConfigError::InvalidConfiguration { .. }
        )
    }
}

impl TrayError for tray_paths::PathError {
    fn error_code(&self) -> &'static str {
        match self {
            tray_paths::PathError::HomeNotFound => "HOME_NOT_FOUND",
        }
    }

    fn is_user_error(&self) -> bool {
        true
    }
}
