//! `postline publish`: walk the publications tree and post what is due.

use std::path::Path;

use crate::app::config::{self, Config};
use crate::domain::{AppError, Platform, ProfileStore};
use crate::services::fanvue::FanvueClient;
use crate::services::image_host::ImageHostClient;
use crate::services::meta_graph::MetaClient;
use crate::services::scheduler::{ScheduleReport, Scheduler};

pub fn execute(
    config: &Config,
    profile_name: Option<&str>,
    platform: Option<Platform>,
    dry_run: bool,
) -> Result<(), AppError> {
    let store = ProfileStore::new(&config.resources_path);
    let profile = super::select_profile(&store, profile_name)?;

    for platform in super::platforms(platform) {
        let root = profile.publications_path(platform)?;
        if !root.is_dir() {
            eprintln!("⚠️ [{profile}/{platform}] no publications yet, run 'postline generate'");
            continue;
        }

        let report = publish_tree(config, platform, &root, dry_run)?;
        println!(
            "✅ [{profile}/{platform}] {} published, {} already done, {} skipped",
            report.published, report.skipped_done, report.skipped_invalid
        );
    }
    Ok(())
}

fn publish_tree(
    config: &Config,
    platform: Platform,
    root: &Path,
    dry_run: bool,
) -> Result<ScheduleReport, AppError> {
    // dry runs never talk to a platform, so no credentials are needed
    if dry_run {
        return Scheduler::new(Vec::new()).dry_run().run(root);
    }

    match platform {
        Platform::Meta => {
            let image_host = ImageHostClient::new(
                config.url(&config.endpoints.image_host)?,
                config::require_env("IMG_HIPPO_API_KEY")?,
                &config.api,
            )?;
            let meta = MetaClient::new(
                config.url(&config.endpoints.graph_api)?,
                config::require_env("META_ACCESS_TOKEN")?,
                config::require_env("META_USER_ID")?,
                image_host,
                &config.api,
            )?;
            Scheduler::new(vec![&meta]).run(root)
        }
        Platform::Fanvue => {
            let fanvue = FanvueClient::new(
                config.url(&config.endpoints.fanvue)?,
                config::require_env("FANVUE_API_KEY")?,
                &config.api,
            )?;
            Scheduler::new(vec![&fanvue]).run(root)
        }
    }
}
