//! Publications generator: turns a calendar into day folders with assets.
//!
//! For every planned day it materializes `week_n/day_m/` with `captions.txt`,
//! `upload_times.txt`, and one rendered image per described image. Existing
//! images are left alone, so an interrupted run resumes where it stopped.

use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;

use crate::domain::{AppError, Planning, Platform, Profile};
use crate::ports::ImageGenerator;

#[derive(Debug, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub days: usize,
    pub images_generated: usize,
    pub images_skipped: usize,
}

pub struct PublicationsGenerator<'a> {
    image_generator: &'a dyn ImageGenerator,
}

impl<'a> PublicationsGenerator<'a> {
    pub fn new(image_generator: &'a dyn ImageGenerator) -> Self {
        Self { image_generator }
    }

    /// Materialize the publications tree for one profile/platform.
    pub fn generate(
        &self,
        profile: &Profile,
        platform: Platform,
        planning: &Planning,
    ) -> Result<GenerationReport, AppError> {
        let root = profile.publications_path(platform)?;
        let mut report = GenerationReport::default();

        for (week_key, days) in planning.weeks_in_order() {
            for day in days {
                if day.posts.is_empty() {
                    continue;
                }
                let day_dir = root.join(week_key).join(format!("day_{}", day.day));
                fs::create_dir_all(&day_dir)?;
                report.days += 1;

                let captions: Vec<String> =
                    day.posts.iter().map(|post| post.full_caption()).collect();
                fs::write(day_dir.join("captions.txt"), captions.join("\n\n") + "\n")?;

                let times: Vec<&str> = day
                    .posts
                    .iter()
                    .map(|post| post.upload_time.trim())
                    .filter(|t| !t.is_empty())
                    .collect();
                if !times.is_empty() {
                    fs::write(day_dir.join("upload_times.txt"), times.join("\n") + "\n")?;
                }

                for post in &day.posts {
                    let slug = post.slug(day.day);
                    for (index, image) in post.images.iter().enumerate() {
                        let path = day_dir.join(format!("{slug}_{}.png", index + 1));
                        if path.is_file() {
                            report.images_skipped += 1;
                            continue;
                        }
                        println!("🎨 rendering {}", path.display());
                        self.image_generator.generate(
                            &image.image_description,
                            seed_for(&path),
                            &path,
                        )?;
                        if !path.is_file() {
                            return Err(AppError::ImageGeneration(path));
                        }
                        report.images_generated += 1;
                    }
                }
            }
        }
        Ok(report)
    }
}

/// Deterministic per-file seed so a re-render of the same slot is
/// reproducible.
fn seed_for(path: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();
    path.file_name().hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ProfileStore;
    use crate::domain::profile::{INITIAL_CONDITIONS_FILE, WORKFLOW_SUFFIX};
    use std::cell::RefCell;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct RecordingGenerator {
        calls: RefCell<Vec<(String, PathBuf)>>,
        fail: bool,
    }

    impl RecordingGenerator {
        fn new() -> Self {
            Self { calls: RefCell::new(vec![]), fail: false }
        }
    }

    impl ImageGenerator for RecordingGenerator {
        fn generate(&self, prompt: &str, _seed: u64, output_path: &Path) -> Result<(), AppError> {
            if self.fail {
                return Err(AppError::ImageGeneration(output_path.to_path_buf()));
            }
            self.calls.borrow_mut().push((prompt.to_string(), output_path.to_path_buf()));
            fs::write(output_path, b"png")?;
            Ok(())
        }
    }

    const CHAIN: &str = r#"{
        "lang": "en",
        "prompts": [
            {"prompt": "p", "cache_key": "k", "system_prompt": "day {{day}}",
             "output_as_json": false, "is_sensitive_content": false}
        ]
    }"#;

    fn profile_in(tmp: &TempDir) -> Profile {
        let dir = tmp.path().join("laura_vigne");
        for platform in Platform::ALL {
            let inputs = dir.join(platform.dir_name()).join("inputs");
            fs::create_dir_all(&inputs).unwrap();
            fs::write(inputs.join(INITIAL_CONDITIONS_FILE), "Start.").unwrap();
            fs::write(inputs.join("laura_vigne.json"), CHAIN).unwrap();
        }
        fs::write(dir.join(format!("laura_vigne{WORKFLOW_SUFFIX}")), "{}").unwrap();
        ProfileStore::new(tmp.path()).load_profile("laura_vigne").unwrap()
    }

    fn planning() -> Planning {
        Planning::from_json(
            r##"{"week_1": [
                {"day": 1, "posts": [{"title": "First Light", "caption": "Dawn.",
                    "hashtags": ["#sun"], "upload_time": "2026-03-02T18:00:00",
                    "images": [{"image_description": "sunrise"}, {"image_description": "beach"}]}]},
                {"day": 2, "posts": []}
            ]}"##,
        )
        .unwrap()
    }

    #[test]
    fn writes_captions_times_and_images() {
        let tmp = TempDir::new().unwrap();
        let profile = profile_in(&tmp);
        let images = RecordingGenerator::new();

        let report = PublicationsGenerator::new(&images)
            .generate(&profile, Platform::Meta, &planning())
            .unwrap();

        assert_eq!(report, GenerationReport { days: 1, images_generated: 2, images_skipped: 0 });

        let day = profile
            .publications_path(Platform::Meta)
            .unwrap()
            .join("week_1")
            .join("day_1");
        assert_eq!(fs::read_to_string(day.join("captions.txt")).unwrap(), "Dawn.\n#sun\n");
        assert_eq!(
            fs::read_to_string(day.join("upload_times.txt")).unwrap(),
            "2026-03-02T18:00:00\n"
        );
        assert!(day.join("first-light_1.png").is_file());
        assert!(day.join("first-light_2.png").is_file());

        let calls = images.calls.borrow();
        assert_eq!(calls[0].0, "sunrise");
        assert_eq!(calls[1].0, "beach");
    }

    #[test]
    fn existing_images_are_skipped() {
        let tmp = TempDir::new().unwrap();
        let profile = profile_in(&tmp);
        let images = RecordingGenerator::new();
        let generator = PublicationsGenerator::new(&images);

        generator.generate(&profile, Platform::Meta, &planning()).unwrap();
        let second = generator.generate(&profile, Platform::Meta, &planning()).unwrap();

        assert_eq!(second, GenerationReport { days: 1, images_generated: 0, images_skipped: 2 });
    }

    #[test]
    fn generation_failure_is_fatal() {
        let tmp = TempDir::new().unwrap();
        let profile = profile_in(&tmp);
        let images = RecordingGenerator { calls: RefCell::new(vec![]), fail: true };

        let err = PublicationsGenerator::new(&images)
            .generate(&profile, Platform::Meta, &planning())
            .unwrap_err();
        assert!(matches!(err, AppError::ImageGeneration(_)));
    }

    #[test]
    fn seeds_are_stable_per_filename() {
        let a = seed_for(Path::new("week_1/day_1/first-light_1.png"));
        let b = seed_for(Path::new("week_2/day_9/first-light_1.png"));
        let c = seed_for(Path::new("week_1/day_1/first-light_2.png"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
