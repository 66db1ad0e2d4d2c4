//! `postline plan`: run the prompt chain and write the calendar.

use chrono::Local;

use crate::app::config::{self, Config};
use crate::domain::{AppError, Platform, ProfileStore};
use crate::services::llm::ChatClient;
use crate::services::planner::Planner;
use crate::services::storyline;

pub fn execute(
    config: &Config,
    profile_name: Option<&str>,
    platform: Option<Platform>,
    fresh: bool,
) -> Result<(), AppError> {
    let store = ProfileStore::new(&config.resources_path);
    let profile = super::select_profile(&store, profile_name)?;

    let mut model = ChatClient::new(
        config.url(&config.endpoints.llm)?,
        config::llm_api_key()?,
        config.preferred_models.clone(),
        config.censored_models.clone(),
        &config.api,
    )?;

    for platform in super::platforms(platform) {
        let planning =
            Planner::new(&mut model).plan(&profile, platform, Local::now().date_naive(), fresh)?;
        storyline::record(&mut model, &profile, platform, &planning, Local::now())?;
        println!(
            "✅ [{profile}/{platform}] planned {} week(s), storyline updated",
            planning.weeks.len()
        );
    }
    Ok(())
}
