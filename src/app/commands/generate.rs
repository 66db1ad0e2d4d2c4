//! `postline generate`: render the publications tree from the calendar.

use crate::app::config::Config;
use crate::domain::{AppError, Planning, Platform, ProfileStore};
use crate::services::comfy::ComfyClient;
use crate::services::generator::PublicationsGenerator;

pub fn execute(
    config: &Config,
    profile_name: Option<&str>,
    platform: Option<Platform>,
) -> Result<(), AppError> {
    let store = ProfileStore::new(&config.resources_path);
    let profile = super::select_profile(&store, profile_name)?;

    let comfy = ComfyClient::new(
        config.url(&config.endpoints.comfy)?,
        store.workflow_path(&profile),
        &config.api,
    )?;
    comfy.check_connection()?;

    for platform in super::platforms(platform) {
        let planning = Planning::load(&profile.planning_path(platform)?)?;
        let report =
            PublicationsGenerator::new(&comfy).generate(&profile, platform, &planning)?;
        println!(
            "✅ [{profile}/{platform}] {} day(s): {} image(s) rendered, {} already present",
            report.days, report.images_generated, report.images_skipped
        );
    }
    Ok(())
}
