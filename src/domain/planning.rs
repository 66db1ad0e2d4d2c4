//! Calendar model produced by the planning stage.
//!
//! The planning file maps week keys (`week_1`, `week_2`, ..) to lists of
//! days, each day holding one or more posts with captions, hashtags, an
//! upload time, and image descriptions.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::AppError;

/// One image to generate for a post.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSpec {
    #[serde(default)]
    pub image_description: String,
}

/// A planned post within a day.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedPost {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub caption: String,
    #[serde(default)]
    pub hashtags: Vec<String>,
    #[serde(default)]
    pub upload_time: String,
    #[serde(default)]
    pub images: Vec<ImageSpec>,
}

impl PlannedPost {
    /// Caption with hashtags appended on a new line.
    pub fn full_caption(&self) -> String {
        let caption = self.caption.trim();
        if self.hashtags.is_empty() {
            caption.to_string()
        } else {
            format!("{caption}\n{}", self.hashtags.join(" "))
        }
    }

    /// Filesystem slug derived from the title.
    pub fn slug(&self, day: u32) -> String {
        if self.title.trim().is_empty() {
            format!("publication_{day}")
        } else {
            slug::slugify(&self.title)
        }
    }
}

/// A planned day within a week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannedDay {
    pub day: u32,
    #[serde(default)]
    pub posts: Vec<PlannedPost>,
}

/// The whole calendar keyed by week.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Planning {
    pub weeks: BTreeMap<String, Vec<PlannedDay>>,
}

impl Planning {
    /// Parse a planning JSON document.
    pub fn from_json(content: &str) -> Result<Self, AppError> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a planning file, mapping a missing file to `PlanningMissing`.
    pub fn load(path: &Path) -> Result<Self, AppError> {
        if !path.is_file() {
            return Err(AppError::PlanningMissing(path.to_path_buf()));
        }
        Self::from_json(&fs::read_to_string(path)?)
    }

    /// Write the planning file pretty-printed.
    pub fn save(&self, path: &Path) -> Result<(), AppError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Weeks ordered by numeric suffix, so `week_2` precedes `week_10`.
    pub fn weeks_in_order(&self) -> Vec<(&String, &Vec<PlannedDay>)> {
        let mut weeks: Vec<_> = self.weeks.iter().collect();
        weeks.sort_by_key(|(key, _)| numeric_suffix(key));
        weeks
    }

    /// All captions across the calendar, in week/day order.
    pub fn all_captions(&self) -> Vec<&str> {
        self.weeks_in_order()
            .into_iter()
            .flat_map(|(_, days)| days.iter())
            .flat_map(|day| day.posts.iter())
            .filter(|post| !post.caption.is_empty())
            .map(|post| post.caption.as_str())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.weeks.is_empty()
    }
}

/// Numeric suffix of names like `week_3` or `day_12`; names without one sort
/// after numbered entries, tie-broken by the full name.
pub fn numeric_suffix(name: &str) -> (u64, String) {
    let number = name
        .rsplit('_')
        .next()
        .and_then(|tail| tail.parse::<u64>().ok())
        .unwrap_or(u64::MAX);
    (number, name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r##"{
        "week_1": [
            {
                "day": 1,
                "posts": [
                    {
                        "title": "A New Threat Emerges",
                        "caption": "Something is coming.",
                        "hashtags": ["#ai", "#story"],
                        "upload_time": "2026-03-02T18:00:00",
                        "images": [{"image_description": "a neon skyline"}]
                    }
                ]
            }
        ],
        "week_2": [
            {"day": 1, "posts": []}
        ]
    }"##;

    #[test]
    fn parses_sample_calendar() {
        let planning = Planning::from_json(SAMPLE).unwrap();
        assert_eq!(planning.weeks.len(), 2);
        let post = &planning.weeks["week_1"][0].posts[0];
        assert_eq!(post.slug(1), "a-new-threat-emerges");
        assert_eq!(post.full_caption(), "Something is coming.\n#ai #story");
        assert_eq!(planning.all_captions(), vec!["Something is coming."]);
    }

    #[test]
    fn untitled_post_slug_falls_back_to_day() {
        let post = PlannedPost {
            title: "  ".into(),
            caption: String::new(),
            hashtags: vec![],
            upload_time: String::new(),
            images: vec![],
        };
        assert_eq!(post.slug(4), "publication_4");
    }

    #[test]
    fn weeks_ordered_numerically() {
        let mut planning = Planning::default();
        for key in ["week_10", "week_2", "week_1"] {
            planning.weeks.insert(key.to_string(), vec![]);
        }
        let order: Vec<&str> =
            planning.weeks_in_order().into_iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(order, vec!["week_1", "week_2", "week_10"]);
    }
}
