//! YouTube upload client.
//!
//! Authenticates with a long-lived OAuth refresh token, checks the channel's
//! uploads playlist so the same title is never published twice, and pushes the
//! video through the resumable upload endpoint.

use std::cell::RefCell;
use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use url::Url;

use crate::domain::AppError;
use crate::services::ApiTuning;

/// Category names YouTube accepts, mapped to their numeric ids.
const CATEGORIES: [(&str, &str); 8] = [
    ("Film & Animation", "1"),
    ("Music", "10"),
    ("Pets & Animals", "15"),
    ("Gaming", "20"),
    ("People & Blogs", "22"),
    ("Comedy", "23"),
    ("Entertainment", "24"),
    ("Education", "27"),
];

const DEFAULT_CATEGORY_ID: &str = "22";

pub struct VideoUpload<'a> {
    pub path: &'a Path,
    pub title: &'a str,
    pub description: &'a str,
    pub tags: Vec<String>,
    pub category: &'a str,
    pub privacy: &'a str,
}

pub struct YouTubeClient {
    oauth_url: Url,
    api_url: Url,
    upload_url: Url,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    client: Client,
    access_token: RefCell<Option<String>>,
}

impl YouTubeClient {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        oauth_url: Url,
        api_url: Url,
        upload_url: Url,
        client_id: String,
        client_secret: String,
        refresh_token: String,
        tuning: &ApiTuning,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()
            .map_err(|e| AppError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            oauth_url,
            api_url,
            upload_url,
            client_id,
            client_secret,
            refresh_token,
            client,
            access_token: RefCell::new(None),
        })
    }

    pub fn category_id(name: &str) -> &'static str {
        CATEGORIES
            .iter()
            .find(|(label, _)| label.eq_ignore_ascii_case(name))
            .map(|(_, id)| *id)
            .unwrap_or(DEFAULT_CATEGORY_ID)
    }

    fn access_token(&self) -> Result<String, AppError> {
        if let Some(token) = self.access_token.borrow().as_ref() {
            return Ok(token.clone());
        }

        let form: Vec<(&str, &str)> = vec![
            ("client_id", &self.client_id),
            ("client_secret", &self.client_secret),
            ("refresh_token", &self.refresh_token),
            ("grant_type", "refresh_token"),
        ];
        let response = self
            .client
            .post(self.oauth_url.clone())
            .form(&form)
            .send()
            .map_err(|e| AppError::api("YouTube", format!("token refresh failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::api(
                "YouTube",
                format!("token refresh returned {}: {body}", status.as_u16()),
            ));
        }
        let reply: Value = response
            .json()
            .map_err(|e| AppError::api("YouTube", format!("bad token reply: {e}")))?;
        let token = reply["access_token"]
            .as_str()
            .ok_or_else(|| AppError::api("YouTube", "token reply carried no access_token"))?
            .to_string();
        *self.access_token.borrow_mut() = Some(token.clone());
        Ok(token)
    }

    fn get_json(&self, mut url: Url, query: &[(&str, &str)]) -> Result<Value, AppError> {
        let token = self.access_token()?;
        url.query_pairs_mut().extend_pairs(query);
        let response = self
            .client
            .get(url)
            .bearer_auth(&token)
            .send()
            .map_err(|e| AppError::api("YouTube", format!("request failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(AppError::api(
                "YouTube",
                format!("request returned {}: {body}", status.as_u16()),
            ));
        }
        response.json().map_err(|e| AppError::api("YouTube", format!("bad reply: {e}")))
    }

    fn uploads_playlist(&self) -> Result<String, AppError> {
        let url = self
            .api_url
            .join("channels")
            .map_err(|e| AppError::config_error(format!("Invalid YouTube API URL: {e}")))?;
        let reply = self.get_json(url, &[("part", "contentDetails"), ("mine", "true")])?;
        reply["items"][0]["contentDetails"]["relatedPlaylists"]["uploads"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("YouTube", "channel has no uploads playlist"))
    }

    /// Titles already present in the channel's uploads playlist.
    pub fn uploaded_titles(&self) -> Result<Vec<String>, AppError> {
        let playlist = self.uploads_playlist()?;
        let url = self
            .api_url
            .join("playlistItems")
            .map_err(|e| AppError::config_error(format!("Invalid YouTube API URL: {e}")))?;
        let mut titles = Vec::new();
        let mut page_token = String::new();
        loop {
            let mut query: Vec<(&str, &str)> = vec![
                ("part", "snippet"),
                ("playlistId", &playlist),
                ("maxResults", "50"),
            ];
            if !page_token.is_empty() {
                query.push(("pageToken", &page_token));
            }
            let reply = self.get_json(url.clone(), &query)?;
            if let Some(items) = reply["items"].as_array() {
                for item in items {
                    if let Some(title) = item["snippet"]["title"].as_str() {
                        titles.push(title.to_string());
                    }
                }
            }
            match reply["nextPageToken"].as_str() {
                Some(next) => page_token = next.to_string(),
                None => break,
            }
        }
        Ok(titles)
    }

    /// Upload a video; refuses titles the channel already carries.
    pub fn upload(&self, video: &VideoUpload) -> Result<String, AppError> {
        let existing = self.uploaded_titles()?;
        if existing.iter().any(|title| title == video.title) {
            return Err(AppError::api(
                "YouTube",
                format!("a video titled {:?} already exists on the channel", video.title),
            ));
        }

        let token = self.access_token()?;
        let metadata = serde_json::json!({
            "snippet": {
                "title": video.title,
                "description": video.description,
                "tags": &video.tags,
                "categoryId": Self::category_id(video.category),
            },
            "status": { "privacyStatus": video.privacy },
        });

        let mut start_url = self.upload_url.clone();
        start_url
            .query_pairs_mut()
            .append_pair("uploadType", "resumable")
            .append_pair("part", "snippet,status");
        let response = self
            .client
            .post(start_url)
            .bearer_auth(&token)
            .json(&metadata)
            .send()
            .map_err(|e| AppError::api("YouTube", format!("upload session failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::api(
                "YouTube",
                format!("upload session returned {}", response.status().as_u16()),
            ));
        }
        let session_url = response
            .headers()
            .get("location")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .ok_or_else(|| AppError::api("YouTube", "upload session carried no location"))?;

        let bytes = fs::read(video.path)?;
        let response = self
            .client
            .put(session_url.as_str())
            .bearer_auth(&token)
            .header("Content-Type", "video/*")
            .body(bytes)
            .send()
            .map_err(|e| AppError::api("YouTube", format!("upload failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::api(
                "YouTube",
                format!("upload returned {}", status.as_u16()),
            ));
        }
        let reply: Value = response
            .json()
            .map_err(|e| AppError::api("YouTube", format!("bad upload reply: {e}")))?;
        reply["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("YouTube", "upload reply carried no video id"))
    }
}
