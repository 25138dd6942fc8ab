//! Core runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into services. The intent is to avoid reading process-wide environment variables
//! during request handling, which can lead to inconsistent behaviour in multi-threaded runtimes
//! and test harnesses.

use crate::constants::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL, DEFAULT_HISTORY_FILE};
use crate::{CoreError, CoreResult};
use std::fmt;
use std::path::{Path, PathBuf};

/// Core configuration resolved at startup.
#[derive(Clone)]
pub struct CoreConfig {
    history_file: PathBuf,
    gemini_model: String,
    gemini_base_url: String,
    api_key: Option<String>,
}

impl CoreConfig {
    /// Create a new `CoreConfig`.
    ///
    /// An empty API key is treated as absent.
    pub fn new(
        history_file: PathBuf,
        gemini_model: String,
        gemini_base_url: String,
        api_key: Option<String>,
    ) -> CoreResult<Self> {
        if gemini_model.trim().is_empty() {
            return Err(CoreError::InvalidInput(
                "gemini_model cannot be empty".into(),
            ));
        }

        let gemini_base_url = gemini_base_url.trim().trim_end_matches('/').to_string();
        if !(gemini_base_url.starts_with("https://") || gemini_base_url.starts_with("http://")) {
            return Err(CoreError::InvalidInput(
                "gemini_base_url must be an http(s) URL".into(),
            ));
        }

        Ok(Self {
            history_file,
            gemini_model: gemini_model.trim().to_string(),
            gemini_base_url,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        })
    }

    /// Builds a config from optional raw values (typically environment variables), falling back
    /// to defaults for anything missing.
    pub fn from_values(
        history_file: Option<String>,
        gemini_model: Option<String>,
        gemini_base_url: Option<String>,
        api_key: Option<String>,
    ) -> CoreResult<Self> {
        let history_file = resolve_history_file(history_file.map(PathBuf::from))?;
        Self::new(
            history_file,
            non_empty(gemini_model).unwrap_or_else(|| DEFAULT_GEMINI_MODEL.into()),
            non_empty(gemini_base_url).unwrap_or_else(|| DEFAULT_GEMINI_BASE_URL.into()),
            api_key,
        )
    }

    pub fn history_file(&self) -> &Path {
        &self.history_file
    }

    pub fn gemini_model(&self) -> &str {
        &self.gemini_model
    }

    pub fn gemini_base_url(&self) -> &str {
        &self.gemini_base_url
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }
}

impl fmt::Debug for CoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreConfig")
            .field("history_file", &self.history_file)
            .field("gemini_model", &self.gemini_model)
            .field("gemini_base_url", &self.gemini_base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Resolve the history file path.
///
/// `None` (or an empty override) yields [`DEFAULT_HISTORY_FILE`] relative to the working
/// directory. The path may not exist yet, but it must not be a directory.
pub fn resolve_history_file(override_path: Option<PathBuf>) -> CoreResult<PathBuf> {
    let path = override_path
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_HISTORY_FILE));

    if path.is_dir() {
        return Err(CoreError::InvalidInput(format!(
            "history file path is a directory: {}",
            path.display()
        )));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_values_are_missing() {
        let cfg = CoreConfig::from_values(None, None, Some("  ".into()), None).expect("config");
        assert_eq!(cfg.history_file(), Path::new(DEFAULT_HISTORY_FILE));
        assert_eq!(cfg.gemini_model(), DEFAULT_GEMINI_MODEL);
        assert_eq!(cfg.gemini_base_url(), DEFAULT_GEMINI_BASE_URL);
        assert_eq!(cfg.api_key(), None);
    }

    #[test]
    fn empty_api_key_is_absent() {
        let cfg = CoreConfig::from_values(None, None, None, Some("".into())).expect("config");
        assert_eq!(cfg.api_key(), None);
    }

    #[test]
    fn rejects_empty_model() {
        let err = CoreConfig::new(
            PathBuf::from("h.json"),
            " ".into(),
            DEFAULT_GEMINI_BASE_URL.into(),
            None,
        )
        .expect_err("should reject");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("gemini_model")));
    }

    #[test]
    fn rejects_non_http_base_url_and_trims_trailing_slash() {
        let err = CoreConfig::new(
            PathBuf::from("h.json"),
            "m".into(),
            "ftp://example".into(),
            None,
        )
        .expect_err("should reject");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("gemini_base_url")));

        let cfg = CoreConfig::new(
            PathBuf::from("h.json"),
            "m".into(),
            "http://localhost:8080/v1beta/".into(),
            None,
        )
        .expect("config");
        assert_eq!(cfg.gemini_base_url(), "http://localhost:8080/v1beta");
    }

    #[test]
    fn rejects_directory_as_history_file() {
        let dir = std::env::temp_dir();
        let err = resolve_history_file(Some(dir)).expect_err("directory");
        assert!(matches!(err, CoreError::InvalidInput(msg) if msg.contains("is a directory")));
    }

    #[test]
    fn debug_output_redacts_api_key() {
        let cfg = CoreConfig::from_values(None, None, None, Some("secret-key".into()))
            .expect("config");
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("secret-key"));
        assert!(debug.contains("<redacted>"));
    }
}
