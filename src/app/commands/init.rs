//! `postline init`: stamp out a starter profile.

use std::fs;

use crate::app::config::Config;
use crate::domain::AppError;
use crate::services::profile_scaffold;

pub fn execute(config: &Config, name: &str) -> Result<(), AppError> {
    fs::create_dir_all(&config.resources_path)?;
    let profile_dir = profile_scaffold::deploy(&config.resources_path, name)?;
    println!("✅ Created profile at {}", profile_dir.display());
    println!("   Edit the prompt chain and storyline under meta/inputs and fanvue/inputs,");
    println!("   then replace {name}_comfyworkflow.json with your own workflow export.");
    Ok(())
}
