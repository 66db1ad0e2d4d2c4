use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Library-wide error type for postline operations.
#[derive(Debug, Error)]
pub enum AppError {
    /// Underlying I/O failure.
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Configuration or environment issue.
    #[error("{0}")]
    Configuration(String),

    /// Resources directory missing.
    #[error("Resources directory not found: {0}")]
    ResourcesNotFound(PathBuf),

    /// Profile name is invalid.
    #[error("Invalid profile name '{0}': must be snake_case like 'laura_vigne'")]
    InvalidProfileName(String),

    /// Profile not found in the resources directory.
    #[error("Profile '{0}' not found")]
    ProfileNotFound(String),

    /// Profile already exists at the target location.
    #[error("Profile '{0}' already exists")]
    ProfileExists(String),

    /// A required file is missing from a profile tree.
    #[error("Missing {what}: {path}")]
    MissingProfileFile { what: &'static str, path: PathBuf },

    /// Prompt chain schema violation.
    #[error("Prompt schema error in {path}: {reason}")]
    PromptSchema { path: PathBuf, reason: String },

    /// Prompt template rendering failed.
    #[error("Failed to render template {template}: {reason}")]
    TemplateRender { template: String, reason: String },

    /// Template control syntax is not allowed in prompt chains.
    #[error("Template syntax '{token}' is not allowed in {template}")]
    TemplateSyntaxNotAllowed { template: String, token: &'static str },

    /// Planning file missing for a profile/platform.
    #[error("Planning file not found: {0}. Run 'postline plan' first.")]
    PlanningMissing(PathBuf),

    /// The model reply could not be decoded as calendar JSON.
    #[error("Failed to decode calendar JSON from model reply: {0}")]
    CalendarDecode(String),

    /// Image generation failed for an output path.
    #[error("Image generation failed for '{0}'")]
    ImageGeneration(PathBuf),

    /// A platform API call failed.
    #[error("{platform} API error: {details}")]
    Api { platform: &'static str, details: String },

    /// Caption exceeds the platform limit.
    #[error("Caption exceeds the maximum allowed length of {limit} characters")]
    CaptionTooLong { limit: usize },

    /// Unsupported image extension for upload.
    #[error("Unsupported image file '{0}': must be .png, .jpg, or .jpeg")]
    UnsupportedImage(PathBuf),

    /// All preferred models were exhausted or refused the request.
    #[error("No model could complete the request: {0}")]
    ModelsExhausted(String),

    /// Upload ledger is malformed.
    #[error("Malformed published.toml: {0}")]
    MalformedLedger(String),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

impl AppError {
    pub fn config_error<S: Into<String>>(message: S) -> Self {
        AppError::Configuration(message.into())
    }

    pub fn api<S: Into<String>>(platform: &'static str, details: S) -> Self {
        AppError::Api { platform, details: details.into() }
    }
}
