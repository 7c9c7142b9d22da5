//! Runtime configuration, parsed once from flags and environment variables
//! and then handed to the components that need it.

use clap::Args;
use std::path::PathBuf;

use crate::constants;

#[derive(Args, Debug, Clone)]
pub struct Config {
    /// API key for the Google Gemini generative language API.
    #[arg(long, global = true, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Base URL of the generative language API.
    #[arg(long, global = true, env = "GEMINI_BASE_URL", default_value = constants::DEFAULT_GEMINI_BASE_URL)]
    pub gemini_base_url: String,

    /// Gemini model used for completions.
    #[arg(long, global = true, env = "GEMINI_MODEL", default_value = constants::DEFAULT_GEMINI_MODEL)]
    pub gemini_model: String,

    /// API key for the YouTube Data API.
    #[arg(long, global = true, env = "YOUTUBE_API_KEY", hide_env_values = true)]
    pub youtube_api_key: Option<String>,

    /// Base URL of the YouTube Data API.
    #[arg(long, global = true, env = "YOUTUBE_BASE_URL", default_value = constants::DEFAULT_YOUTUBE_BASE_URL)]
    pub youtube_base_url: String,

    /// Directory holding the page templates.
    #[arg(long, global = true, default_value = "templates")]
    pub templates_dir: PathBuf,

    /// Directory served under /static.
    #[arg(long, global = true, default_value = "static")]
    pub static_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            gemini_api_key: None,
            gemini_base_url: constants::DEFAULT_GEMINI_BASE_URL.to_string(),
            gemini_model: constants::DEFAULT_GEMINI_MODEL.to_string(),
            youtube_api_key: None,
            youtube_base_url: constants::DEFAULT_YOUTUBE_BASE_URL.to_string(),
            templates_dir: PathBuf::from("templates"),
            static_dir: PathBuf::from("static"),
        }
    }
}

/// Treats empty credential values the same as unset ones.
pub(crate) fn credential(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
