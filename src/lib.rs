//! postline: plan, render, and publish AI-persona content calendars.
//!
//! The pipeline runs in three stages per profile and platform: `plan` asks a
//! chat model to continue the persona's storyline and emit a week calendar,
//! `generate` renders that calendar into day folders with captions and
//! ComfyUI images, and `publish` walks the folders and posts whatever is due.

pub mod app;
pub mod domain;
pub mod ports;
pub mod services;

use std::path::Path;

use app::commands::{doctor, generate, init, plan, publish, run, youtube};
use app::config::Config;

pub use app::commands::doctor::DoctorReport;
pub use app::commands::youtube::UploadArgs;
pub use domain::{AppError, Platform};

/// Create a starter profile under the resources directory.
pub fn init(name: &str) -> Result<(), AppError> {
    init::execute(&Config::load()?, name)
}

/// Run the prompt chain and write the planning file.
pub fn plan(
    profile: Option<&str>,
    platform: Option<Platform>,
    fresh: bool,
) -> Result<(), AppError> {
    plan::execute(&Config::load()?, profile, platform, fresh)
}

/// Render the publications tree from the planning file.
pub fn generate(profile: Option<&str>, platform: Option<Platform>) -> Result<(), AppError> {
    generate::execute(&Config::load()?, profile, platform)
}

/// Publish every due day folder.
pub fn publish(
    profile: Option<&str>,
    platform: Option<Platform>,
    dry_run: bool,
) -> Result<(), AppError> {
    publish::execute(&Config::load()?, profile, platform, dry_run)
}

/// Plan, generate, and publish in one pass.
pub fn run(
    profile: Option<&str>,
    platform: Option<Platform>,
    dry_run: bool,
) -> Result<(), AppError> {
    run::execute(&Config::load()?, profile, platform, dry_run)
}

/// Upload a video to the configured YouTube channel.
pub fn youtube_upload(args: &UploadArgs) -> Result<(), AppError> {
    youtube::upload(&Config::load()?, args)
}

/// Preflight checks for credentials, profiles, and local services.
pub fn doctor(check_comfy: bool) -> Result<DoctorReport, AppError> {
    doctor::execute(&Config::load()?, check_comfy)
}

/// Convenience re-export used by integration tests and scripts.
pub fn config_from(path: &Path) -> Result<Config, AppError> {
    Config::load_from(path)
}
