//! Runtime configuration: `postline.toml` plus environment credentials.
//!
//! The config file is optional; every field has a default aimed at the
//! standard setup (GitHub Models inference, local ComfyUI, public platform
//! endpoints). Secrets only ever come from the environment.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use url::Url;

use crate::domain::AppError;
use crate::services::ApiTuning;

pub const CONFIG_FILE: &str = "postline.toml";

/// Base URLs of every backend the pipeline talks to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Endpoints {
    pub llm: String,
    pub comfy: String,
    pub image_host: String,
    pub graph_api: String,
    pub fanvue: String,
    pub youtube_oauth: String,
    pub youtube_api: String,
    pub youtube_upload: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            llm: "https://models.github.ai/inference/".into(),
            comfy: "http://127.0.0.1:8188/".into(),
            image_host: "https://api.imghippo.com/".into(),
            graph_api: "https://graph.facebook.com/v21.0/".into(),
            fanvue: "https://api.fanvue.com/".into(),
            youtube_oauth: "https://oauth2.googleapis.com/token".into(),
            youtube_api: "https://www.googleapis.com/youtube/v3/".into(),
            youtube_upload: "https://www.googleapis.com/upload/youtube/v3/videos".into(),
        }
    }
}

/// Contents of `postline.toml`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub resources_path: PathBuf,
    pub preferred_models: Vec<String>,
    /// Models whose content moderation refuses sensitive prompts; chain steps
    /// flagged sensitive are routed past these.
    pub censored_models: Vec<String>,
    pub endpoints: Endpoints,
    pub api: ApiTuning,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            resources_path: PathBuf::from("resources"),
            preferred_models: vec![
                "openai/gpt-4o".into(),
                "openai/gpt-4o-mini".into(),
                "meta/llama-3.3-70b-instruct".into(),
            ],
            censored_models: vec!["openai/gpt-4o".into(), "openai/gpt-4o-mini".into()],
            endpoints: Endpoints::default(),
            api: ApiTuning::default(),
        }
    }
}

impl Config {
    /// Load `postline.toml` from the working directory, or defaults when the
    /// file is absent.
    pub fn load() -> Result<Self, AppError> {
        Self::load_from(Path::new(CONFIG_FILE))
    }

    pub fn load_from(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let config: Config = toml::from_str(&fs::read_to_string(path)?)?;
        Ok(config)
    }

    pub fn url(&self, raw: &str) -> Result<Url, AppError> {
        Url::parse(raw)
            .map_err(|e| AppError::config_error(format!("Invalid URL '{raw}' in config: {e}")))
    }
}

/// Read a required secret from the environment.
pub fn require_env(key: &str) -> Result<String, AppError> {
    env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| {
            AppError::config_error(format!("{key} environment variable is not set"))
        })
}

/// API key for the chat backend: `OPENAI_API_KEY`, or the first
/// `GITHUB_API_KEY*` variable when several accounts are rotated.
pub fn llm_api_key() -> Result<String, AppError> {
    if let Ok(key) = env::var("OPENAI_API_KEY")
        && !key.trim().is_empty()
    {
        return Ok(key);
    }
    let mut github_keys: Vec<(String, String)> = env::vars()
        .filter(|(name, value)| name.starts_with("GITHUB_API_KEY") && !value.trim().is_empty())
        .collect();
    github_keys.sort();
    github_keys
        .into_iter()
        .next()
        .map(|(_, value)| value)
        .ok_or_else(|| {
            AppError::config_error(
                "No LLM credentials: set OPENAI_API_KEY or GITHUB_API_KEY",
            )
        })
}
