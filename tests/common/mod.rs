//! Shared testing utilities for postline CLI tests.

use assert_cmd::Command;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Isolated working directory with a `resources/` tree for CLI exercises.
#[allow(dead_code)]
pub struct TestContext {
    root: TempDir,
    work_dir: PathBuf,
}

#[allow(dead_code)]
impl TestContext {
    pub fn new() -> Self {
        let root = TempDir::new().expect("Failed to create temp directory for tests");
        let work_dir = root.path().join("work");
        fs::create_dir_all(&work_dir).expect("Failed to create test work directory");
        Self { root, work_dir }
    }

    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Build a command invoking the compiled `postline` binary with a clean
    /// environment so host credentials never leak into assertions.
    pub fn cli(&self) -> Command {
        let mut cmd = Command::cargo_bin("postline").expect("Failed to locate postline binary");
        cmd.current_dir(&self.work_dir).env_clear();
        cmd
    }

    pub fn resources_path(&self) -> PathBuf {
        self.work_dir.join("resources")
    }

    pub fn profile_path(&self, name: &str) -> PathBuf {
        self.resources_path().join(name)
    }

    /// Write a `postline.toml` in the working directory.
    pub fn write_config(&self, content: &str) {
        fs::write(self.work_dir.join("postline.toml"), content).expect("Failed to write config");
    }

    /// Hand-build a publications day folder for a deployed profile.
    pub fn write_day_folder(
        &self,
        profile: &str,
        platform: &str,
        week: &str,
        day: &str,
        caption: &str,
        upload_time: &str,
    ) -> PathBuf {
        let dir = self
            .profile_path(profile)
            .join(platform)
            .join("outputs")
            .join("publications")
            .join(week)
            .join(day);
        fs::create_dir_all(&dir).expect("Failed to create day folder");
        fs::write(dir.join("captions.txt"), caption).expect("Failed to write captions");
        fs::write(dir.join("upload_times.txt"), upload_time).expect("Failed to write upload time");
        fs::write(dir.join("post_1.png"), b"png").expect("Failed to write image");
        dir
    }
}
