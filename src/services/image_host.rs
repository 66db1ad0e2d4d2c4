//! ImgHippo upload client.
//!
//! The Meta Graph API ingests Instagram images by URL only, so locally
//! generated files are first pushed to ImgHippo and published from the
//! returned view URL. Uploads are memoized per path so a carousel retry does
//! not re-upload images that already went through.

use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use url::Url;

use crate::domain::AppError;
use crate::services::ApiTuning;

pub struct ImageHostClient {
    upload_url: Url,
    api_key: String,
    tuning: ApiTuning,
    client: Client,
    uploaded: RefCell<HashMap<PathBuf, String>>,
}

impl ImageHostClient {
    pub fn new(base_url: Url, api_key: String, tuning: &ApiTuning) -> Result<Self, AppError> {
        let upload_url = base_url
            .join("v1/upload")
            .map_err(|e| AppError::config_error(format!("Invalid image host URL: {e}")))?;
        let client = Client::builder()
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()
            .map_err(|e| AppError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            upload_url,
            api_key,
            tuning: tuning.clone(),
            client,
            uploaded: RefCell::new(HashMap::new()),
        })
    }

    /// Upload `path` and return its public view URL. Repeated calls for the
    /// same path return the cached URL without touching the network.
    pub fn upload(&self, path: &Path) -> Result<String, AppError> {
        if let Some(url) = self.uploaded.borrow().get(path) {
            return Ok(url.clone());
        }

        let mut last_failure = String::new();
        for attempt in 1..=self.tuning.max_retries {
            match self.try_upload(path) {
                Ok(url) => {
                    self.uploaded.borrow_mut().insert(path.to_path_buf(), url.clone());
                    return Ok(url);
                }
                Err(AppError::Io(e)) => return Err(AppError::Io(e)),
                Err(e) => last_failure = e.to_string(),
            }
            if attempt < self.tuning.max_retries {
                std::thread::sleep(Duration::from_millis(self.tuning.backoff_ms(attempt)));
            }
        }
        Err(AppError::api(
            "ImgHippo",
            format!("upload of {} failed after {} attempts: {last_failure}", path.display(), self.tuning.max_retries),
        ))
    }

    fn try_upload(&self, path: &Path) -> Result<String, AppError> {
        let form = multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .file("file", path)
            .map_err(AppError::Io)?;

        let response = self
            .client
            .post(self.upload_url.clone())
            .multipart(form)
            .send()
            .map_err(|e| AppError::api("ImgHippo", format!("upload failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api(
                "ImgHippo",
                format!("upload returned {}", status.as_u16()),
            ));
        }

        let body: Value = response
            .json()
            .map_err(|e| AppError::api("ImgHippo", format!("bad upload reply: {e}")))?;
        body["data"]["view_url"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("ImgHippo", "upload reply carried no view_url"))
    }
}
