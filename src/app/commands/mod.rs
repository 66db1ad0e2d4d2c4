//! Command implementations behind the CLI.

pub mod doctor;
pub mod generate;
pub mod init;
pub mod plan;
pub mod publish;
pub mod run;
pub mod youtube;

use dialoguer::Select;

use crate::domain::{AppError, Platform, Profile, ProfileStore};

/// Resolve the target profile: by name when given, interactively otherwise.
fn select_profile(store: &ProfileStore, name: Option<&str>) -> Result<Profile, AppError> {
    if let Some(name) = name {
        return store.load_profile(name);
    }

    let mut profiles = store.load_profiles()?;
    if profiles.is_empty() {
        return Err(AppError::ResourcesNotFound(store.resources_path().to_path_buf()));
    }
    if profiles.len() == 1 {
        return Ok(profiles.remove(0));
    }

    let names: Vec<&str> = profiles.iter().map(|p| p.name.as_str()).collect();
    let index = Select::new()
        .with_prompt("Profile")
        .items(&names)
        .default(0)
        .interact()
        .map_err(|e| AppError::config_error(format!("Profile selection failed: {e}")))?;
    Ok(profiles.remove(index))
}

/// Expand an optional platform choice to the platforms to operate on.
fn platforms(choice: Option<Platform>) -> Vec<Platform> {
    match choice {
        Some(platform) => vec![platform],
        None => Platform::ALL.to_vec(),
    }
}
