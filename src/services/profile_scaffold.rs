//! Embedded starter profile deployed by `postline init`.
//!
//! The scaffold ships one platform subtree (prompt chain template, storyline
//! seed) plus a minimal ComfyUI workflow export. Deployment stamps it out
//! once per platform and renames the templated files after the profile.

use std::fs;
use std::path::{Path, PathBuf};

use include_dir::{Dir, DirEntry, include_dir};

use crate::domain::profile::{WORKFLOW_SUFFIX, is_valid_profile_name};
use crate::domain::{AppError, Platform};

static SCAFFOLD_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/src/assets/profile_scaffold");

const CHAIN_TEMPLATE: &str = "profile.json";
const WORKFLOW_TEMPLATE: &str = "profile_comfyworkflow.json";

/// Create `resources/<name>/` from the embedded scaffold.
///
/// Refuses to touch an existing profile directory.
pub fn deploy(resources_path: &Path, name: &str) -> Result<PathBuf, AppError> {
    if !is_valid_profile_name(name) {
        return Err(AppError::InvalidProfileName(name.to_string()));
    }
    let profile_dir = resources_path.join(name);
    if profile_dir.exists() {
        return Err(AppError::ProfileExists(name.to_string()));
    }

    let workflow = scaffold_file(WORKFLOW_TEMPLATE)?;
    let platform_files = platform_files()?;

    fs::create_dir_all(&profile_dir)?;
    fs::write(profile_dir.join(format!("{name}{WORKFLOW_SUFFIX}")), workflow)?;

    for platform in Platform::ALL {
        let platform_dir = profile_dir.join(platform.dir_name());
        for (relative, content) in &platform_files {
            let file_name = relative
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or_default();
            let target = if file_name == CHAIN_TEMPLATE {
                relative.with_file_name(format!("{name}.json"))
            } else {
                relative.clone()
            };
            let path = platform_dir.join(target);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, content)?;
        }
        fs::create_dir_all(platform_dir.join("outputs"))?;
    }
    Ok(profile_dir)
}

fn scaffold_file(path: &str) -> Result<&'static str, AppError> {
    SCAFFOLD_DIR
        .get_file(path)
        .and_then(|file| file.contents_utf8())
        .ok_or_else(|| AppError::config_error(format!("Embedded scaffold is missing '{path}'")))
}

/// Files under the scaffold's `platform/` subtree, paths relative to it.
fn platform_files() -> Result<Vec<(PathBuf, &'static str)>, AppError> {
    let platform_dir = SCAFFOLD_DIR
        .get_dir("platform")
        .ok_or_else(|| AppError::config_error("Embedded scaffold is missing 'platform/'"))?;
    let mut files = Vec::new();
    collect_files(platform_dir, Path::new("platform"), &mut files);
    files.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(files)
}

fn collect_files(dir: &'static Dir, root: &Path, files: &mut Vec<(PathBuf, &'static str)>) {
    for entry in dir.entries() {
        match entry {
            DirEntry::File(file) => {
                if let (Ok(relative), Some(content)) =
                    (file.path().strip_prefix(root), file.contents_utf8())
                {
                    files.push((relative.to_path_buf(), content));
                }
            }
            DirEntry::Dir(subdir) => collect_files(subdir, root, files),
        }
    }
}
