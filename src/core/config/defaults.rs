use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;

use crate::core::config::data::Config;

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_RELAY_URL: &str = "https://text.pollinations.ai/";
pub const DEFAULT_RELAY_PARAM: &str = "prompt";
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 60;

pub(crate) fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("org", "nexchat", "nexchat")
}

impl Config {
    pub fn model(&self) -> &str {
        self.model.as_deref().unwrap_or(DEFAULT_MODEL)
    }

    pub fn base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    pub fn relay_url(&self) -> &str {
        self.relay_url.as_deref().unwrap_or(DEFAULT_RELAY_URL)
    }

    pub fn relay_param(&self) -> &str {
        self.relay_param.as_deref().unwrap_or(DEFAULT_RELAY_PARAM)
    }

    pub fn stream_enabled(&self) -> bool {
        self.stream.unwrap_or(true)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(
            self.request_timeout_secs
                .filter(|secs| *secs > 0)
                .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Directory holding persisted sessions.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".nexchat"))
    }
}
