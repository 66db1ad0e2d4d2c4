//! Day-folder bookkeeping for the posting scheduler.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};

use crate::domain::AppError;
use crate::domain::planning::numeric_suffix;

/// A single publication read back from a generated day folder.
#[derive(Debug, Clone)]
pub struct Publication {
    pub day_folder: PathBuf,
    pub caption: String,
    pub upload_time: Option<DateTime<Local>>,
    pub images: Vec<PathBuf>,
}

impl Publication {
    /// Read captions, upload time, and images from a day folder.
    ///
    /// Unparseable timestamps are treated as absent rather than fatal; the
    /// scheduler decides whether an incomplete publication is skippable.
    pub fn from_day_folder(day_folder: &Path) -> Result<Publication, AppError> {
        let caption = read_trimmed(&day_folder.join("captions.txt"))?.unwrap_or_default();
        // the file may hold one timestamp per post; the first gates the day
        let raw_time = read_trimmed(&day_folder.join("upload_times.txt"))?;
        let upload_time =
            raw_time.as_deref().and_then(|raw| raw.lines().next()).and_then(parse_upload_time);

        let mut images: Vec<PathBuf> = fs::read_dir(day_folder)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| is_image(path))
            .collect();
        images.sort();

        Ok(Publication { day_folder: day_folder.to_path_buf(), caption, upload_time, images })
    }

    /// A publication needs a caption, a scheduled time, and at least one image.
    pub fn is_valid(&self) -> bool {
        !self.caption.is_empty() && self.upload_time.is_some() && !self.images.is_empty()
    }

    /// Short display name (the `week_x/day_y` tail).
    pub fn display_name(&self) -> String {
        let day = self.day_folder.file_name().and_then(|n| n.to_str()).unwrap_or("?");
        match self.day_folder.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) {
            Some(week) => format!("{week}/{day}"),
            None => day.to_string(),
        }
    }

    /// How long to wait before this publication is due, if at all.
    pub fn delay_from(&self, now: DateTime<Local>) -> Option<Duration> {
        let scheduled = self.upload_time?;
        (scheduled > now).then(|| (scheduled - now).to_std().unwrap_or(Duration::ZERO))
    }
}

/// Day folders under a publications root, weeks then days, numeric-suffix
/// ordered so `week_2` is visited before `week_10`.
pub fn day_folders(publications_root: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut days = Vec::new();
    for week in sorted_subdirs(publications_root)? {
        days.extend(sorted_subdirs(&week)?);
    }
    Ok(days)
}

fn sorted_subdirs(root: &Path) -> Result<Vec<PathBuf>, AppError> {
    let mut dirs: Vec<PathBuf> = fs::read_dir(root)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    dirs.sort_by_key(|path| {
        numeric_suffix(path.file_name().and_then(|n| n.to_str()).unwrap_or(""))
    });
    Ok(dirs)
}

/// Accepts RFC 3339 timestamps or bare `YYYY-MM-DDTHH:MM:SS` local times.
pub fn parse_upload_time(raw: &str) -> Option<DateTime<Local>> {
    let raw = raw.trim();
    if let Ok(fixed) = DateTime::parse_from_rfc3339(raw) {
        return Some(fixed.with_timezone(&Local));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .ok()?;
    Local.from_local_datetime(&naive).single()
}

fn read_trimmed(path: &Path) -> Result<Option<String>, AppError> {
    if !path.is_file() {
        return Ok(None);
    }
    Ok(Some(fs::read_to_string(path)?.trim().to_string()))
}

fn is_image(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(|e| e.to_ascii_lowercase()).as_deref(),
        Some("png" | "jpg" | "jpeg")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn make_day(root: &Path, week: &str, day: &str) -> PathBuf {
        let dir = root.join(week).join(day);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn parses_complete_day_folder() {
        let tmp = TempDir::new().unwrap();
        let day = make_day(tmp.path(), "week_1", "day_1");
        fs::write(day.join("captions.txt"), "Hello world\n#tag\n").unwrap();
        fs::write(day.join("upload_times.txt"), "2026-03-02T18:00:00\n").unwrap();
        fs::write(day.join("post_1.png"), b"png").unwrap();
        fs::write(day.join("post_0.png"), b"png").unwrap();
        fs::write(day.join("notes.txt"), "not an image").unwrap();

        let publication = Publication::from_day_folder(&day).unwrap();
        assert!(publication.is_valid());
        assert_eq!(publication.display_name(), "week_1/day_1");
        // images come back sorted
        let names: Vec<_> = publication
            .images
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["post_0.png", "post_1.png"]);
    }

    #[test]
    fn invalid_timestamp_yields_incomplete_publication() {
        let tmp = TempDir::new().unwrap();
        let day = make_day(tmp.path(), "week_1", "day_2");
        fs::write(day.join("captions.txt"), "caption").unwrap();
        fs::write(day.join("upload_times.txt"), "someday soon").unwrap();
        fs::write(day.join("a.png"), b"png").unwrap();

        let publication = Publication::from_day_folder(&day).unwrap();
        assert!(publication.upload_time.is_none());
        assert!(!publication.is_valid());
    }

    #[test]
    fn day_folders_order_weeks_numerically() {
        let tmp = TempDir::new().unwrap();
        for (week, day) in
            [("week_10", "day_1"), ("week_2", "day_2"), ("week_2", "day_1"), ("week_1", "day_3")]
        {
            make_day(tmp.path(), week, day);
        }
        let days: Vec<String> = day_folders(tmp.path())
            .unwrap()
            .into_iter()
            .map(|p| {
                let day = p.file_name().unwrap().to_str().unwrap();
                let week = p.parent().unwrap().file_name().unwrap().to_str().unwrap();
                format!("{week}/{day}")
            })
            .collect();
        assert_eq!(days, vec!["week_1/day_3", "week_2/day_1", "week_2/day_2", "week_10/day_1"]);
    }

    #[test]
    fn delay_only_for_future_times() {
        let now = Local::now();
        let future = Publication {
            day_folder: PathBuf::from("x"),
            caption: "c".into(),
            upload_time: Some(now + ChronoDuration::seconds(90)),
            images: vec![PathBuf::from("a.png")],
        };
        let delay = future.delay_from(now).unwrap();
        assert!(delay >= Duration::from_secs(89) && delay <= Duration::from_secs(91));

        let past = Publication { upload_time: Some(now - ChronoDuration::seconds(5)), ..future };
        assert!(past.delay_from(now).is_none());
    }

    proptest! {
        #[test]
        fn numeric_week_order_matches_index_order(mut indices in proptest::collection::vec(1u64..200, 1..20)) {
            indices.sort_unstable();
            indices.dedup();
            let names: Vec<String> = indices.iter().map(|i| format!("week_{i}")).collect();

            let mut shuffled: Vec<&String> = names.iter().rev().collect();
            shuffled.sort_by_key(|name| numeric_suffix(name));
            let restored: Vec<String> = shuffled.into_iter().cloned().collect();
            prop_assert_eq!(restored, names);
        }
    }
}
