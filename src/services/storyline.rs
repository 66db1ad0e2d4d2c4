//! Storyline tracker: keeps `initial_conditions.md` rolling forward.
//!
//! After a calendar is planned, its captions are summarized and appended to
//! the storyline file so the next planning run continues the narrative
//! instead of restarting it.

use std::fs::OpenOptions;
use std::io::Write;

use chrono::{DateTime, Local};

use crate::domain::profile::INITIAL_CONDITIONS_FILE;
use crate::domain::{AppError, Planning, Platform, Profile};
use crate::ports::{ChatModel, ChatRequest};

const SUMMARY_PROMPT: &str = "Summarize the following social media captions into a short \
narrative recap of two or three sentences, written in the third person. Keep character and \
plot details that a continuation would need.\n\n";

/// Summarize the planned captions and append the recap to the storyline file.
pub fn record<M: ChatModel>(
    model: &mut M,
    profile: &Profile,
    platform: Platform,
    planning: &Planning,
    now: DateTime<Local>,
) -> Result<(), AppError> {
    let captions = planning.all_captions();
    if captions.is_empty() {
        return Ok(());
    }

    let request = ChatRequest::text(format!("{SUMMARY_PROMPT}{}", captions.join("\n")));
    let summary = model.complete(&request)?;

    let info = profile.platform(platform)?;
    let path = info.inputs_path.join(INITIAL_CONDITIONS_FILE);
    let mut file = OpenOptions::new().append(true).open(&path)?;
    write!(
        file,
        "\n\n**[{}] - Recent Content Summary:**\n\n{}\n",
        now.format("%Y-%m-%d %H:%M"),
        summary.trim()
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProfileStore;
    use crate::domain::profile::WORKFLOW_SUFFIX;
    use chrono::TimeZone;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct OneShotModel(&'static str);

    impl ChatModel for OneShotModel {
        fn complete(&mut self, request: &ChatRequest) -> Result<String, AppError> {
            assert!(request.prompt.contains("Here we go."));
            Ok(self.0.to_string())
        }
    }

    const CHAIN: &str = r#"{
        "lang": "en",
        "prompts": [
            {"prompt": "p", "cache_key": "k", "system_prompt": "day {{day}}",
             "output_as_json": false, "is_sensitive_content": false}
        ]
    }"#;

    fn write_profile(root: &Path, name: &str) {
        let dir = root.join(name);
        for platform in crate::domain::Platform::ALL {
            let inputs = dir.join(platform.dir_name()).join("inputs");
            fs::create_dir_all(&inputs).unwrap();
            fs::write(inputs.join(INITIAL_CONDITIONS_FILE), "The island was quiet.").unwrap();
            fs::write(inputs.join(format!("{name}.json")), CHAIN).unwrap();
        }
        fs::write(dir.join(format!("{name}{WORKFLOW_SUFFIX}")), "{}").unwrap();
    }

    fn sample_planning() -> Planning {
        Planning::from_json(
            r#"{"week_1": [{"day": 1, "posts": [{"caption": "Here we go.", "title": "t",
                "hashtags": [], "upload_time": "", "images": []}]}]}"#,
        )
        .unwrap()
    }

    #[test]
    fn appends_timestamped_recap() {
        let tmp = TempDir::new().unwrap();
        write_profile(tmp.path(), "laura_vigne");
        let profile = ProfileStore::new(tmp.path()).load_profile("laura_vigne").unwrap();

        let now = Local.with_ymd_and_hms(2026, 3, 6, 9, 30, 0).unwrap();
        let mut model = OneShotModel("The storm passed and the island endured.");
        record(&mut model, &profile, Platform::Meta, &sample_planning(), now).unwrap();

        let path = profile
            .platform(Platform::Meta)
            .unwrap()
            .inputs_path
            .join(INITIAL_CONDITIONS_FILE);
        let content = fs::read_to_string(path).unwrap();
        assert!(content.starts_with("The island was quiet."));
        assert!(content.contains("**[2026-03-06 09:30] - Recent Content Summary:**"));
        assert!(content.ends_with("The storm passed and the island endured.\n"));
    }

    #[test]
    fn empty_calendar_leaves_storyline_untouched() {
        let tmp = TempDir::new().unwrap();
        write_profile(tmp.path(), "laura_vigne");
        let profile = ProfileStore::new(tmp.path()).load_profile("laura_vigne").unwrap();

        struct PanicModel;
        impl ChatModel for PanicModel {
            fn complete(&mut self, _: &ChatRequest) -> Result<String, AppError> {
                panic!("must not be called");
            }
        }

        record(&mut PanicModel, &profile, Platform::Meta, &Planning::default(), Local::now())
            .unwrap();

        let path = profile
            .platform(Platform::Meta)
            .unwrap()
            .inputs_path
            .join(INITIAL_CONDITIONS_FILE);
        assert_eq!(fs::read_to_string(path).unwrap(), "The island was quiet.");
    }
}
