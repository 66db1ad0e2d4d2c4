//! Meta Graph API publisher for linked Facebook Page + Instagram accounts.
//!
//! A publication goes out to both surfaces in one call:
//!   * Instagram: one media container per image (carousel when there are
//!     several), then `media_publish`. Containers only accept public URLs, so
//!     images are routed through the image host first.
//!   * Facebook: images go up as unpublished page photos, then one feed post
//!     attaches them all.
//!
//! Page credentials are resolved once from `/{user_id}/accounts` and cached;
//! the page access token is used for everything after that.

use std::cell::RefCell;
use std::path::Path;
use std::time::Duration;

use reqwest::blocking::{multipart, Client};
use serde_json::Value;
use url::Url;

use crate::domain::{AppError, Publication};
use crate::ports::{Publisher, PublishReceipt};
use crate::services::image_host::ImageHostClient;
use crate::services::ApiTuning;

/// Instagram rejects captions longer than this.
pub const CAPTION_LIMIT: usize = 2200;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["png", "jpg", "jpeg"];

#[derive(Debug, Clone)]
struct PageCredentials {
    page_id: String,
    page_token: String,
    instagram_id: String,
}

pub struct MetaClient {
    graph_url: Url,
    user_token: String,
    user_id: String,
    tuning: ApiTuning,
    client: Client,
    image_host: ImageHostClient,
    credentials: RefCell<Option<PageCredentials>>,
}

impl MetaClient {
    pub fn new(
        graph_url: Url,
        user_token: String,
        user_id: String,
        image_host: ImageHostClient,
        tuning: &ApiTuning,
    ) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()
            .map_err(|e| AppError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            graph_url,
            user_token,
            user_id,
            tuning: tuning.clone(),
            client,
            image_host,
            credentials: RefCell::new(None),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, AppError> {
        self.graph_url
            .join(path)
            .map_err(|e| AppError::config_error(format!("Invalid Graph API URL: {e}")))
    }

    fn get_json(&self, url: Url) -> Result<Value, AppError> {
        let mut last_failure = String::new();
        for attempt in 1..=self.tuning.max_retries {
            match self.client.get(url.clone()).send() {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json()
                        .map_err(|e| AppError::api("Meta", format!("bad reply: {e}")));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().unwrap_or_default();
                    last_failure = format!("status {status}: {body}");
                    // Client errors carry a Graph error payload; retrying
                    // won't change the answer. 429 is a transient rate
                    // limit and backs off like 5xx.
                    if (400..500).contains(&status) && status != 429 {
                        break;
                    }
                }
                Err(e) => last_failure = e.to_string(),
            }
            if attempt < self.tuning.max_retries {
                std::thread::sleep(Duration::from_millis(self.tuning.backoff_ms(attempt)));
            }
        }
        Err(AppError::api("Meta", last_failure))
    }

    fn post_form(&self, url: Url, form: &[(&str, &str)]) -> Result<Value, AppError> {
        let mut last_failure = String::new();
        for attempt in 1..=self.tuning.max_retries {
            match self.client.post(url.clone()).form(form).send() {
                Ok(response) if response.status().is_success() => {
                    return response
                        .json()
                        .map_err(|e| AppError::api("Meta", format!("bad reply: {e}")));
                }
                Ok(response) => {
                    let status = response.status().as_u16();
                    let body = response.text().unwrap_or_default();
                    last_failure = format!("status {status}: {body}");
                    if (400..500).contains(&status) && status != 429 {
                        break;
                    }
                }
                Err(e) => last_failure = e.to_string(),
            }
            if attempt < self.tuning.max_retries {
                std::thread::sleep(Duration::from_millis(self.tuning.backoff_ms(attempt)));
            }
        }
        Err(AppError::api("Meta", last_failure))
    }

    /// Resolve the first managed page plus its Instagram business account.
    fn credentials(&self) -> Result<PageCredentials, AppError> {
        if let Some(creds) = self.credentials.borrow().as_ref() {
            return Ok(creds.clone());
        }

        let mut url = self.endpoint(&format!("{}/accounts", self.user_id))?;
        url.query_pairs_mut().append_pair("access_token", &self.user_token);
        let accounts = self.get_json(url)?;
        let page = accounts["data"]
            .as_array()
            .and_then(|pages| pages.first())
            .ok_or_else(|| AppError::api("Meta", "user manages no pages"))?;
        let page_id = page["id"]
            .as_str()
            .ok_or_else(|| AppError::api("Meta", "page entry carried no id"))?
            .to_string();
        let page_token = page["access_token"]
            .as_str()
            .ok_or_else(|| AppError::api("Meta", "page entry carried no access_token"))?
            .to_string();

        let mut url = self.endpoint(&page_id)?;
        url.query_pairs_mut()
            .append_pair("fields", "instagram_business_account")
            .append_pair("access_token", &page_token);
        let page_info = self.get_json(url)?;
        let instagram_id = page_info["instagram_business_account"]["id"]
            .as_str()
            .ok_or_else(|| AppError::api("Meta", "page has no linked Instagram account"))?
            .to_string();

        let creds = PageCredentials { page_id, page_token, instagram_id };
        *self.credentials.borrow_mut() = Some(creds.clone());
        Ok(creds)
    }

    fn validate(&self, publication: &Publication) -> Result<(), AppError> {
        if publication.caption.chars().count() > CAPTION_LIMIT {
            return Err(AppError::CaptionTooLong { limit: CAPTION_LIMIT });
        }
        for image in &publication.images {
            let supported = image
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    SUPPORTED_EXTENSIONS.iter().any(|s| ext.eq_ignore_ascii_case(s))
                });
            if !supported {
                return Err(AppError::UnsupportedImage(image.clone()));
            }
        }
        Ok(())
    }

    fn create_container(
        &self,
        creds: &PageCredentials,
        image_url: &str,
        caption: Option<&str>,
        carousel_item: bool,
    ) -> Result<String, AppError> {
        let url = self.endpoint(&format!("{}/media", creds.instagram_id))?;
        let mut form: Vec<(&str, &str)> = vec![
            ("image_url", image_url),
            ("access_token", &creds.page_token),
        ];
        if let Some(caption) = caption {
            form.push(("caption", caption));
        }
        if carousel_item {
            form.push(("is_carousel_item", "true"));
        }
        let reply = self.post_form(url, &form)?;
        reply["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("Meta", "media container reply carried no id"))
    }

    fn publish_instagram(
        &self,
        creds: &PageCredentials,
        publication: &Publication,
    ) -> Result<String, AppError> {
        let mut image_urls = Vec::with_capacity(publication.images.len());
        for image in &publication.images {
            image_urls.push(self.image_host.upload(image)?);
        }

        let creation_id = if let [single] = image_urls.as_slice() {
            self.create_container(creds, single, Some(&publication.caption), false)?
        } else {
            let mut children = Vec::with_capacity(image_urls.len());
            for image_url in &image_urls {
                children.push(self.create_container(creds, image_url, None, true)?);
            }
            let url = self.endpoint(&format!("{}/media", creds.instagram_id))?;
            let children = children.join(",");
            let form: Vec<(&str, &str)> = vec![
                ("media_type", "CAROUSEL"),
                ("children", &children),
                ("caption", &publication.caption),
                ("access_token", &creds.page_token),
            ];
            let reply = self.post_form(url, &form)?;
            reply["id"]
                .as_str()
                .map(str::to_string)
                .ok_or_else(|| AppError::api("Meta", "carousel reply carried no id"))?
        };

        let url = self.endpoint(&format!("{}/media_publish", creds.instagram_id))?;
        let form: Vec<(&str, &str)> =
            vec![("creation_id", &creation_id), ("access_token", &creds.page_token)];
        let reply = self.post_form(url, &form)?;
        reply["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("Meta", "media_publish reply carried no id"))
    }

    fn upload_page_photo(&self, creds: &PageCredentials, image: &Path) -> Result<String, AppError> {
        let url = self.endpoint(&format!("{}/photos", creds.page_id))?;
        let form = multipart::Form::new()
            .text("published", "false")
            .text("access_token", creds.page_token.clone())
            .file("source", image)
            .map_err(AppError::Io)?;
        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .map_err(|e| AppError::api("Meta", format!("photo upload failed: {e}")))?;
        if !response.status().is_success() {
            return Err(AppError::api(
                "Meta",
                format!("photo upload returned {}", response.status().as_u16()),
            ));
        }
        let reply: Value = response
            .json()
            .map_err(|e| AppError::api("Meta", format!("bad photo reply: {e}")))?;
        reply["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("Meta", "photo reply carried no id"))
    }

    fn publish_facebook(
        &self,
        creds: &PageCredentials,
        publication: &Publication,
    ) -> Result<String, AppError> {
        let mut photo_ids = Vec::with_capacity(publication.images.len());
        for image in &publication.images {
            photo_ids.push(self.upload_page_photo(creds, image)?);
        }

        let url = self.endpoint(&format!("{}/feed", creds.page_id))?;
        let attached: Vec<String> = photo_ids
            .iter()
            .map(|id| format!(r#"{{"media_fbid":"{id}"}}"#))
            .collect();
        let mut form: Vec<(String, String)> = vec![
            ("message".into(), publication.caption.clone()),
            ("access_token".into(), creds.page_token.clone()),
        ];
        for (i, media) in attached.into_iter().enumerate() {
            form.push((format!("attached_media[{i}]"), media));
        }
        let form_refs: Vec<(&str, &str)> =
            form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        let reply = self.post_form(url, &form_refs)?;
        reply["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| AppError::api("Meta", "feed reply carried no id"))
    }
}

impl Publisher for MetaClient {
    fn platform_name(&self) -> &'static str {
        "Meta"
    }

    fn publish(&self, publication: &Publication) -> Result<PublishReceipt, AppError> {
        self.validate(publication)?;
        let creds = self.credentials()?;
        let instagram_post = self.publish_instagram(&creds, publication)?;
        let facebook_post = self.publish_facebook(&creds, publication)?;
        Ok(PublishReceipt { post_ids: vec![instagram_post, facebook_post] })
    }
}
