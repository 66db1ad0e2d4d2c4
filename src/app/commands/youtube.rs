//! `postline youtube upload`: push a video to the channel.

use std::path::Path;

use crate::app::config::{self, Config};
use crate::domain::AppError;
use crate::services::youtube::{VideoUpload, YouTubeClient};

pub struct UploadArgs<'a> {
    pub video: &'a Path,
    pub title: &'a str,
    pub description: &'a str,
    pub tags: Vec<String>,
    pub category: &'a str,
    pub privacy: &'a str,
}

pub fn upload(config: &Config, args: &UploadArgs) -> Result<(), AppError> {
    if !args.video.is_file() {
        return Err(AppError::config_error(format!(
            "Video file not found: {}",
            args.video.display()
        )));
    }

    let client = YouTubeClient::new(
        config.url(&config.endpoints.youtube_oauth)?,
        config.url(&config.endpoints.youtube_api)?,
        config.url(&config.endpoints.youtube_upload)?,
        config::require_env("YT_CLIENT_ID")?,
        config::require_env("YT_CLIENT_SECRET")?,
        config::require_env("YT_REFRESH_TOKEN")?,
        &config.api,
    )?;

    let video_id = client.upload(&VideoUpload {
        path: args.video,
        title: args.title,
        description: args.description,
        tags: args.tags.clone(),
        category: args.category,
        privacy: args.privacy,
    })?;
    println!("✅ Uploaded: https://youtu.be/{video_id}");
    Ok(())
}
