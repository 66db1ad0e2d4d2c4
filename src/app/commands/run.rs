//! `postline run`: the whole pipeline in one go.

use crate::app::config::Config;
use crate::app::commands::{generate, plan, publish};
use crate::domain::{AppError, Platform, ProfileStore};

pub fn execute(
    config: &Config,
    profile_name: Option<&str>,
    platform: Option<Platform>,
    dry_run: bool,
) -> Result<(), AppError> {
    // resolve the profile once so the stages never prompt twice
    let store = ProfileStore::new(&config.resources_path);
    let profile = super::select_profile(&store, profile_name)?;
    let name = profile.name.clone();

    plan::execute(config, Some(&name), platform, false)?;
    generate::execute(config, Some(&name), platform)?;
    publish::execute(config, Some(&name), platform, dry_run)
}
