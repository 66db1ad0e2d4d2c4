//! Fanvue publisher.
//!
//! Uses the Fanvue creator API with an API key: each image is uploaded as a
//! media item first, then a single post references the media UUIDs.

use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use url::Url;

use crate::domain::{AppError, Publication};
use crate::ports::{Publisher, PublishReceipt};
use crate::services::ApiTuning;

const API_KEY_HEADER: &str = "X-Fanvue-API-Key";
const API_VERSION_HEADER: &str = "X-Fanvue-API-Version";
const API_VERSION: &str = "2025-06-26";

pub struct FanvueClient {
    base_url: Url,
    api_key: String,
    tuning: ApiTuning,
    client: Client,
}

impl FanvueClient {
    pub fn new(base_url: Url, api_key: String, tuning: &ApiTuning) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()
            .map_err(|e| AppError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self { base_url, api_key, tuning: tuning.clone(), client })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.base_url
            .join(path)
            .map_err(|e| AppError::config_error(format!("Invalid Fanvue URL: {e}")))
    }

    fn upload_media(&self, image: &Path) -> Result<String, AppError> {
        let url = self.endpoint("media/uploads")?;
        let mut last_failure = String::new();
        for attempt in 1..=self.tuning.max_retries {
            let form = multipart::Form::new().file("file", image).map_err(AppError::Io)?;
            match self
                .client
                .post(url.clone())
                .header(API_KEY_HEADER, &self.api_key)
                .header(API_VERSION_HEADER, API_VERSION)
                .multipart(form)
                .send()
            {
                Ok(response) if response.status().is_success() => {
                    let reply: Value = response
                        .json()
                        .map_err(|e| AppError::api("Fanvue", format!("bad upload reply: {e}")))?;
                    return reply["uuid"]
                        .as_str()
                        .map(str::to_string)
                        .ok_or_else(|| AppError::api("Fanvue", "upload reply carried no uuid"));
                }
                Ok(response) => {
                    last_failure = format!("upload returned {}", response.status().as_u16())
                }
                Err(e) => last_failure = format!("upload failed: {e}"),
            }
            if attempt < self.tuning.max_retries {
                std::thread::sleep(Duration::from_millis(self.tuning.backoff_ms(attempt)));
            }
        }
        Err(AppError::api("Fanvue", last_failure))
    }

    fn create_post(&self, caption: &str, media_uuids: &[String]) -> Result<String, AppError> {
        let url = self.endpoint("posts")?;
        let payload = serde_json::json!({ "text": caption, "mediaUuids": media_uuids });
        let response = self
            .client
            .post(url)
            .header(API_KEY_HEADER, &self.api_key)
            .header(API_VERSION_HEADER, API_VERSION)
            .json(&payload)
            .send()
            .map_err(|e| AppError::api("Fanvue", format!("post failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::api(
                "Fanvue",
                format!("post returned {}: {body}", status.as_u16()),
            ));
        }
        let reply: Value =
            response.json().map_err(|e| AppError::api("Fanvue", format!("bad post reply: {e}")))?;
        reply["uuid"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("Fanvue", "post reply carried no uuid"))
    }
}

impl Publisher for FanvueClient {
    fn platform_name(&self) -> &'static str {
        "Fanvue"
    }

    fn publish(&self, publication: &Publication) -> Result<PublishReceipt, AppError> {
        let mut media_uuids = Vec::with_capacity(publication.images.len());
        for image in &publication.images {
            media_uuids.push(self.upload_media(image)?);
        }
        let post_uuid = self.create_post(&publication.caption, &media_uuids)?;
        Ok(PublishReceipt { post_ids: vec![post_uuid] })
    }
}
