use std::path::PathBuf;

/// Errors that can occur across the Repopulse engine.
///
/// Each variant wraps a specific failure domain. Most public operations
/// degrade to a documented default instead of surfacing an error (see the
/// component docs); this type appears where the caller genuinely needs to
/// distinguish failure, such as git invocation and configuration loading.
///
/// # Examples
///
/// ```
/// use repopulse_core::PulseError;
///
/// let err = PulseError::Git("merge-base exited with 128".into());
/// assert!(err.to_string().contains("merge-base"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PulseError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git invocation failure: missing binary, timeout, or non-zero exit.
    #[error("git error: {0}")]
    Git(String),

    /// A line of git output that did not match its expected format.
    #[error("parse error: {0}")]
    Parse(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_converts() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: PulseError = io_err.into();
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn git_error_displays_message() {
        let err = PulseError::Git("timed out after 30s".into());
        assert_eq!(err.to_string(), "git error: timed out after 30s");
    }

    #[test]
    fn file_not_found_shows_path() {
        let err = PulseError::FileNotFound(PathBuf::from("/tmp/missing.toml"));
        assert!(err.to_string().contains("/tmp/missing.toml"));
    }
}
