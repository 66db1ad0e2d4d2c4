//! `postline doctor`: preflight checks for credentials and services.

use crate::app::config::{self, Config};
use crate::domain::{AppError, ProfileStore};
use crate::services::comfy::ComfyClient;

#[derive(Debug, Default)]
pub struct DoctorReport {
    pub issues: usize,
}

impl DoctorReport {
    pub fn is_healthy(&self) -> bool {
        self.issues == 0
    }

    fn check(&mut self, label: &str, result: Result<String, AppError>) {
        match result {
            Ok(detail) => println!("✅ {label}: {detail}"),
            Err(err) => {
                eprintln!("⚠️ {label}: {err}");
                self.issues += 1;
            }
        }
    }
}

pub fn execute(config: &Config, check_comfy: bool) -> Result<DoctorReport, AppError> {
    let mut report = DoctorReport::default();

    let store = ProfileStore::new(&config.resources_path);
    report.check(
        "profiles",
        store
            .load_profiles()
            .map(|profiles| format!("{} valid profile(s)", profiles.len())),
    );

    report.check("LLM credentials", config::llm_api_key().map(|_| "present".into()));
    for key in ["META_ACCESS_TOKEN", "META_USER_ID", "IMG_HIPPO_API_KEY", "FANVUE_API_KEY"] {
        report.check(key, config::require_env(key).map(|_| "present".into()));
    }

    // YouTube is optional; missing credentials are informational only
    let youtube_ready = ["YT_CLIENT_ID", "YT_CLIENT_SECRET", "YT_REFRESH_TOKEN"]
        .iter()
        .all(|key| config::require_env(key).is_ok());
    if youtube_ready {
        println!("✅ YouTube credentials: present");
    } else {
        println!("ℹ️ YouTube credentials: not set (only needed for 'youtube upload')");
    }

    if check_comfy {
        // workflow path is irrelevant for a connectivity probe
        let comfy = ComfyClient::new(
            config.url(&config.endpoints.comfy)?,
            config.resources_path.clone(),
            &config.api,
        )?;
        report.check(
            "ComfyUI",
            comfy.check_connection().map(|()| format!("reachable at {}", config.endpoints.comfy)),
        );
    }

    if report.is_healthy() {
        println!("✅ All checks passed");
    } else {
        eprintln!("⚠️ {} issue(s) found", report.issues);
    }
    Ok(report)
}
