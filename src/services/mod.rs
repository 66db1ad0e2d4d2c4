//! HTTP clients and pipeline stages.

pub mod comfy;
pub mod fanvue;
pub mod generator;
pub mod image_host;
pub mod llm;
pub mod meta_graph;
pub mod planner;
pub mod profile_scaffold;
pub mod scheduler;
pub mod storyline;
pub mod youtube;

/// Retry/backoff tuning shared by the HTTP clients.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(default)]
pub struct ApiTuning {
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_secs: u64,
}

impl Default for ApiTuning {
    fn default() -> Self {
        Self { max_retries: 3, retry_delay_ms: 500, timeout_secs: 60 }
    }
}

impl ApiTuning {
    /// Fast tuning for tests against mock servers.
    #[cfg(test)]
    pub(crate) fn fast() -> Self {
        Self { max_retries: 3, retry_delay_ms: 1, timeout_secs: 5 }
    }

    /// Exponential backoff delay before `attempt` (1-based retries).
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        self.retry_delay_ms * 2_u64.pow(attempt.saturating_sub(1))
    }
}
