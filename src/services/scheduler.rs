//! Posting scheduler: walks the publications tree and dispatches due posts.
//!
//! Day folders are visited in week/day order. A `published.toml` ledger at
//! the tree root records a content digest per published day, so re-running
//! the scheduler never double-posts and a regenerated day (different digest)
//! goes out again.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::publication::day_folders;
use crate::domain::{AppError, Publication};
use crate::ports::Publisher;

const LEDGER_FILE: &str = "published.toml";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub digest: String,
    pub posted_at: String,
    #[serde(default)]
    pub post_ids: Vec<String>,
}

/// Per-tree record of what already went out, keyed by `week_x/day_y`.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub published: BTreeMap<String, LedgerEntry>,
}

impl Ledger {
    pub fn load(root: &Path) -> Result<Self, AppError> {
        let path = root.join(LEDGER_FILE);
        if !path.is_file() {
            return Ok(Self::default());
        }
        let ledger: Ledger = toml::from_str(&fs::read_to_string(&path)?)?;
        Ok(ledger)
    }

    pub fn save(&self, root: &Path) -> Result<(), AppError> {
        let content = toml::to_string_pretty(self)
            .map_err(|err| AppError::MalformedLedger(err.to_string()))?;
        fs::write(root.join(LEDGER_FILE), content)?;
        Ok(())
    }

    fn is_published(&self, name: &str, digest: &str) -> bool {
        self.published.get(name).is_some_and(|entry| entry.digest == digest)
    }
}

/// Content digest of a publication: caption plus every image's bytes.
pub fn publication_digest(publication: &Publication) -> Result<String, AppError> {
    let mut hasher = Sha256::new();
    hasher.update(publication.caption.as_bytes());
    for image in &publication.images {
        hasher.update(fs::read(image)?);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

#[derive(Debug, Default)]
pub struct ScheduleReport {
    pub published: usize,
    pub skipped_done: usize,
    pub skipped_invalid: usize,
}

pub struct Scheduler<'a> {
    publishers: Vec<&'a dyn Publisher>,
    dry_run: bool,
}

impl<'a> Scheduler<'a> {
    pub fn new(publishers: Vec<&'a dyn Publisher>) -> Self {
        Self { publishers, dry_run: false }
    }

    /// List what would be published without waiting or calling any platform.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Walk the publications tree and post everything that is due.
    ///
    /// Publications scheduled in the future block the walk until due; the
    /// tree is ordered, so later folders are never due earlier.
    pub fn run(&self, publications_root: &Path) -> Result<ScheduleReport, AppError> {
        let mut ledger = Ledger::load(publications_root)?;
        let mut report = ScheduleReport::default();

        for day_folder in day_folders(publications_root)? {
            match self.process_day(&day_folder, &mut ledger, publications_root)? {
                DayOutcome::Published => report.published += 1,
                DayOutcome::AlreadyDone => report.skipped_done += 1,
                DayOutcome::Invalid => report.skipped_invalid += 1,
            }
        }
        Ok(report)
    }

    fn process_day(
        &self,
        day_folder: &PathBuf,
        ledger: &mut Ledger,
        root: &Path,
    ) -> Result<DayOutcome, AppError> {
        let publication = Publication::from_day_folder(day_folder)?;
        let name = publication.display_name();

        if !publication.is_valid() {
            eprintln!("⚠️ {name}: incomplete publication, skipping");
            return Ok(DayOutcome::Invalid);
        }

        let digest = publication_digest(&publication)?;
        if ledger.is_published(&name, &digest) {
            return Ok(DayOutcome::AlreadyDone);
        }

        if self.dry_run {
            match publication.delay_from(Local::now()) {
                Some(delay) => println!(
                    "📋 {name}: due in {}s, would publish {} image(s)",
                    delay.as_secs(),
                    publication.images.len()
                ),
                None => println!("📋 {name}: would publish {} image(s)", publication.images.len()),
            }
            return Ok(DayOutcome::Published);
        }

        if let Some(delay) = publication.delay_from(Local::now()) {
            println!("⏳ {name}: due in {}s, waiting", delay.as_secs());
            std::thread::sleep(delay);
        }

        let mut post_ids = Vec::new();
        for publisher in &self.publishers {
            let receipt = publisher.publish(&publication)?;
            println!("✅ {name}: published on {}", publisher.platform_name());
            post_ids.extend(receipt.post_ids);
        }

        ledger.published.insert(
            name,
            LedgerEntry {
                digest,
                posted_at: Local::now().format("%Y-%m-%dT%H:%M:%S").to_string(),
                post_ids,
            },
        );
        ledger.save(root)?;
        Ok(DayOutcome::Published)
    }
}

enum DayOutcome {
    Published,
    AlreadyDone,
    Invalid,
}
