//! ComfyUI client: queue a patched workflow, wait for it, fetch the image.
//!
//! Works against a locally running ComfyUI server. The profile ships an
//! exported workflow JSON; per image the first `CLIPTextEncode` node gets the
//! prompt text and the first `KSampler` node gets the seed. Completion is
//! detected by polling `/history/<prompt_id>` until the job reports outputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use reqwest::blocking::Client;
use serde_json::Value;
use url::Url;

use crate::domain::AppError;
use crate::ports::ImageGenerator;
use crate::services::ApiTuning;

pub struct ComfyClient {
    server: Url,
    workflow_path: PathBuf,
    tuning: ApiTuning,
    client: Client,
    client_id: String,
}

impl ComfyClient {
    pub fn new(server: Url, workflow_path: PathBuf, tuning: &ApiTuning) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()
            .map_err(|e| AppError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            server,
            workflow_path,
            tuning: tuning.clone(),
            client,
            client_id: format!("postline-{}", std::process::id()),
        })
    }

    /// Probe the server before a long generation run.
    pub fn check_connection(&self) -> Result<(), AppError> {
        let url = self.endpoint("system_stats")?;
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::api("ComfyUI", format!("server not reachable: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::api(
                "ComfyUI",
                format!("system_stats returned {}", response.status().as_u16()),
            ));
        }
        Ok(())
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.server
            .join(path)
            .map_err(|e| AppError::config_error(format!("Invalid ComfyUI server URL: {e}")))
    }

    fn patched_workflow(&self, prompt: &str, seed: u64) -> Result<Value, AppError> {
        let mut workflow: Value = serde_json::from_str(&fs::read_to_string(&self.workflow_path)?)?;
        let Some(nodes) = workflow.as_object_mut() else {
            return Err(AppError::config_error(format!(
                "Workflow {} is not a JSON object",
                self.workflow_path.display()
            )));
        };

        let mut prompt_set = false;
        let mut seed_set = false;
        for node in nodes.values_mut() {
            match node.get("class_type").and_then(Value::as_str) {
                Some("CLIPTextEncode") if !prompt_set => {
                    node["inputs"]["text"] = Value::from(prompt);
                    prompt_set = true;
                }
                Some("KSampler") if !seed_set => {
                    node["inputs"]["seed"] = Value::from(seed);
                    seed_set = true;
                }
                _ => {}
            }
        }
        if !prompt_set {
            return Err(AppError::config_error(format!(
                "Workflow {} has no CLIPTextEncode node to patch",
                self.workflow_path.display()
            )));
        }
        Ok(workflow)
    }

    fn queue(&self, workflow: &Value) -> Result<String, AppError> {
        let payload =
            serde_json::json!({ "prompt": workflow, "client_id": self.client_id });
        let response = self
            .client
            .post(self.endpoint("prompt")?)
            .json(&payload)
            .send()
            .map_err(|e| AppError::api("ComfyUI", format!("queue failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::api(
                "ComfyUI",
                format!("queue returned {}", response.status().as_u16()),
            ));
        }
        let body: Value =
            response.json().map_err(|e| AppError::api("ComfyUI", format!("bad queue reply: {e}")))?;
        body["prompt_id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("ComfyUI", "queue reply carried no prompt_id"))
    }

    /// Poll history until the prompt reports outputs; returns the first image
    /// descriptor (`filename`/`subfolder`/`type`).
    fn wait_for_outputs(&self, prompt_id: &str) -> Result<Value, AppError> {
        let url = self.endpoint(&format!("history/{prompt_id}"))?;
        let deadline = Instant::now() + Duration::from_secs(self.tuning.timeout_secs);

        loop {
            let response = self
                .client
                .get(url.clone())
                .send()
                .map_err(|e| AppError::api("ComfyUI", format!("history failed: {e}")))?;
            if response.status().is_success() {
                let body: Value = response
                    .json()
                    .map_err(|e| AppError::api("ComfyUI", format!("bad history reply: {e}")))?;
                if let Some(entry) = body.get(prompt_id)
                    && let Some(outputs) = entry.get("outputs").and_then(Value::as_object)
                    && let Some(image) = outputs
                        .values()
                        .filter_map(|node| node.get("images"))
                        .filter_map(|images| images.as_array())
                        .flat_map(|images| images.iter())
                        .next()
                {
                    return Ok(image.clone());
                }
            }

            if Instant::now() >= deadline {
                return Err(AppError::api(
                    "ComfyUI",
                    format!("prompt {prompt_id} produced no outputs within {}s", self.tuning.timeout_secs),
                ));
            }
            std::thread::sleep(Duration::from_millis(self.tuning.retry_delay_ms));
        }
    }

    fn fetch_image(&self, descriptor: &Value) -> Result<Vec<u8>, AppError> {
        let mut url = self.endpoint("view")?;
        {
            let mut query = url.query_pairs_mut();
            for key in ["filename", "subfolder", "type"] {
                if let Some(value) = descriptor.get(key).and_then(Value::as_str) {
                    query.append_pair(key, value);
                }
            }
        }
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| AppError::api("ComfyUI", format!("view failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::api(
                "ComfyUI",
                format!("view returned {}", response.status().as_u16()),
            ));
        }
        let bytes = response
            .bytes()
            .map_err(|e| AppError::api("ComfyUI", format!("view body unreadable: {e}")))?;
        Ok(bytes.to_vec())
    }
}

impl ImageGenerator for ComfyClient {
    fn generate(&self, prompt: &str, seed: u64, output_path: &Path) -> Result<(), AppError> {
        let workflow = self.patched_workflow(prompt, seed)?;
        let prompt_id = self.queue(&workflow)?;
        let descriptor = self.wait_for_outputs(&prompt_id)?;
        let bytes = self.fetch_image(&descriptor)?;
        fs::write(output_path, bytes)?;
        Ok(())
    }
}
