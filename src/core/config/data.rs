use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    /// Gemini model id (e.g., "gemini-3-flash-preview")
    pub model: Option<String>,
    /// API base URL; the model endpoint is appended to it
    pub base_url: Option<String>,
    /// Credential-free endpoint used when no API key is configured
    pub relay_url: Option<String>,
    /// Query parameter that carries the prompt on relay requests
    pub relay_param: Option<String>,
    /// Stream answers into the transcript as they arrive
    pub stream: Option<bool>,
    /// Where session history is stored
    pub data_dir: Option<PathBuf>,
    pub request_timeout_secs: Option<u64>,
}

/// Get a user-friendly display string for a path
/// Converts absolute paths to use ~ notation on Unix-like systems when possible
///
/// # Examples
/// - Unix: `/home/user/.local/share/nexchat` → `~/.local/share/nexchat`
/// - Windows: `C:\\Users\\user\\AppData\\Roaming\\nexchat` is returned unchanged
pub fn path_display<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();

    #[cfg(unix)]
    {
        if let Some(home) = std::env::var_os("HOME") {
            let home_path = PathBuf::from(home);
            if let Ok(relative) = path.strip_prefix(&home_path) {
                return format!("~/{}", relative.display());
            }
        }
    }

    path.display().to_string()
}
