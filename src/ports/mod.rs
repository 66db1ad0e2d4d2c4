//! Trait seams between the pipeline stages and their HTTP backends.

use std::path::Path;

use crate::domain::{AppError, Publication};

/// A single chat completion request.
///
/// Chain steps are independent: each sends at most a system prompt plus one
/// user prompt, with earlier outputs threaded through the template cache
/// rather than the conversation.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system_prompt: Option<String>,
    pub prompt: String,
    /// Ask the backend for a `json_object` response.
    pub as_json: bool,
    /// Route around models whose content moderation would refuse the prompt.
    pub sensitive: bool,
}

impl ChatRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self { system_prompt: None, prompt: prompt.into(), as_json: false, sensitive: false }
    }
}

/// Chat-completion backend used by planning and storyline stages.
pub trait ChatModel {
    fn complete(&mut self, request: &ChatRequest) -> Result<String, AppError>;
}

/// Image synthesis backend used by the publications generator.
pub trait ImageGenerator {
    /// Render `prompt` to `output_path`; the file must exist on success.
    fn generate(&self, prompt: &str, seed: u64, output_path: &Path) -> Result<(), AppError>;
}

/// Receipt for a completed platform publish.
#[derive(Debug, Clone, Default)]
pub struct PublishReceipt {
    /// Remote identifiers created by the platform, in publish order.
    pub post_ids: Vec<String>,
}

/// Platform backend the posting scheduler dispatches to.
pub trait Publisher {
    /// Platform label used in progress output.
    fn platform_name(&self) -> &'static str;

    fn publish(&self, publication: &Publication) -> Result<PublishReceipt, AppError>;
}
