//! Persona profiles and the resources tree they live in.
//!
//! A profile directory holds one subdirectory per platform, each with an
//! `inputs/` folder (prompt chain + storyline) and an `outputs/` folder
//! (planning file + publications). Loading is strict: a malformed profile
//! aborts the run rather than being silently skipped.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{AppError, Platform};

/// Suffix of the ComfyUI workflow export expected at the profile root.
pub const WORKFLOW_SUFFIX: &str = "_comfyworkflow.json";

/// Name of the running-storyline file inside `inputs/`.
pub const INITIAL_CONDITIONS_FILE: &str = "initial_conditions.md";

/// One step of a profile's prompt chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PromptItem {
    pub prompt: String,
    pub cache_key: String,
    pub system_prompt: String,
    pub output_as_json: bool,
    pub is_sensitive_content: bool,
}

/// Schema of `<profile>.json` under `inputs/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileInput {
    pub lang: String,
    pub prompts: Vec<PromptItem>,
}

impl ProfileInput {
    /// Parse and validate a prompt chain file.
    pub fn parse(content: &str, path: &Path) -> Result<Self, AppError> {
        let input: ProfileInput =
            serde_json::from_str(content).map_err(|err| AppError::PromptSchema {
                path: path.to_path_buf(),
                reason: err.to_string(),
            })?;
        input.validate(path)?;
        Ok(input)
    }

    fn validate(&self, path: &Path) -> Result<(), AppError> {
        let schema_err = |reason: String| AppError::PromptSchema {
            path: path.to_path_buf(),
            reason,
        };

        if !is_valid_lang(&self.lang) {
            return Err(schema_err(format!(
                "lang '{}' must be a 2-letter code optionally followed by a region, e.g. 'en', 'es', 'en-US'",
                self.lang
            )));
        }
        if self.prompts.is_empty() {
            return Err(schema_err("'prompts' must be a non-empty list".into()));
        }

        let mut seen = std::collections::HashSet::new();
        for (index, item) in self.prompts.iter().enumerate() {
            for (field, value) in [
                ("prompt", &item.prompt),
                ("cache_key", &item.cache_key),
                ("system_prompt", &item.system_prompt),
            ] {
                if value.trim().is_empty() {
                    return Err(schema_err(format!(
                        "prompt index {index}: '{field}' must be a non-empty string"
                    )));
                }
            }
            if !item.system_prompt.contains("{{day}}")
                && !item.system_prompt.contains("{{ day }}")
            {
                return Err(schema_err(format!(
                    "prompt index {index}: system_prompt must include '{{{{day}}}}'"
                )));
            }
            if !seen.insert(item.cache_key.clone()) {
                return Err(schema_err(format!(
                    "duplicate cache_key '{}' at prompt index {index}",
                    item.cache_key
                )));
            }
        }
        Ok(())
    }
}

/// Per-platform I/O paths resolved for a profile.
#[derive(Debug, Clone)]
pub struct PlatformInfo {
    pub inputs_path: PathBuf,
    pub outputs_path: PathBuf,
    pub lang: String,
}

/// Describes a persona, with per-platform I/O paths.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub platform_info: BTreeMap<Platform, PlatformInfo>,
}

impl Profile {
    /// First letter of each name part, e.g. "laura_vigne" → "lv".
    pub fn initials(&self) -> String {
        self.name
            .split('_')
            .filter_map(|part| part.chars().next())
            .collect()
    }

    /// Platform info, or an error naming the missing platform directory.
    pub fn platform(&self, platform: Platform) -> Result<&PlatformInfo, AppError> {
        self.platform_info.get(&platform).ok_or_else(|| AppError::MissingProfileFile {
            what: "platform directory",
            path: PathBuf::from(format!("{}/{}", self.name, platform.dir_name())),
        })
    }

    /// Path of the planning file for a platform.
    pub fn planning_path(&self, platform: Platform) -> Result<PathBuf, AppError> {
        let info = self.platform(platform)?;
        Ok(info.outputs_path.join(format!("{}_planning.json", self.initials())))
    }

    /// Root of the generated publications tree for a platform.
    pub fn publications_path(&self, platform: Platform) -> Result<PathBuf, AppError> {
        Ok(self.platform(platform)?.outputs_path.join("publications"))
    }
}

impl std::fmt::Display for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.name)
    }
}

/// Loads and validates `Profile`s from a resources directory.
#[derive(Debug, Clone)]
pub struct ProfileStore {
    resources_path: PathBuf,
}

impl ProfileStore {
    pub fn new(resources_path: impl Into<PathBuf>) -> Self {
        Self { resources_path: resources_path.into() }
    }

    pub fn resources_path(&self) -> &Path {
        &self.resources_path
    }

    /// Scan the resources directory and load every profile, strictly validated.
    pub fn load_profiles(&self) -> Result<Vec<Profile>, AppError> {
        if !self.resources_path.is_dir() {
            return Err(AppError::ResourcesNotFound(self.resources_path.clone()));
        }

        let mut dirs: Vec<PathBuf> = fs::read_dir(&self.resources_path)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.is_dir())
            .collect();
        dirs.sort();

        let mut profiles = Vec::new();
        for dir in dirs {
            profiles.push(self.load_profile_dir(&dir)?);
        }
        Ok(profiles)
    }

    /// Load a single profile by name.
    pub fn load_profile(&self, name: &str) -> Result<Profile, AppError> {
        let dir = self.resources_path.join(name);
        if !dir.is_dir() {
            return Err(AppError::ProfileNotFound(name.to_string()));
        }
        self.load_profile_dir(&dir)
    }

    /// Path of the ComfyUI workflow export for a profile.
    pub fn workflow_path(&self, profile: &Profile) -> PathBuf {
        self.resources_path.join(&profile.name).join(format!("{}{WORKFLOW_SUFFIX}", profile.name))
    }

    fn load_profile_dir(&self, dir: &Path) -> Result<Profile, AppError> {
        let name = dir
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| AppError::InvalidProfileName(dir.display().to_string()))?
            .to_string();

        if !is_valid_profile_name(&name) {
            return Err(AppError::InvalidProfileName(name));
        }

        let workflow_file = dir.join(format!("{name}{WORKFLOW_SUFFIX}"));
        if !workflow_file.is_file() {
            return Err(AppError::MissingProfileFile {
                what: "ComfyUI workflow JSON",
                path: workflow_file,
            });
        }

        let mut platform_info = BTreeMap::new();
        for platform in Platform::ALL {
            let platform_dir = dir.join(platform.dir_name());
            if !platform_dir.is_dir() {
                return Err(AppError::MissingProfileFile {
                    what: "platform directory",
                    path: platform_dir,
                });
            }
            platform_info.insert(platform, self.gather_platform(&platform_dir, &name)?);
        }

        Ok(Profile { name, platform_info })
    }

    fn gather_platform(&self, platform_dir: &Path, name: &str) -> Result<PlatformInfo, AppError> {
        let inputs = platform_dir.join("inputs");
        let outputs = platform_dir.join("outputs");

        if !inputs.is_dir() {
            return Err(AppError::MissingProfileFile { what: "inputs directory", path: inputs });
        }

        let conditions = inputs.join(INITIAL_CONDITIONS_FILE);
        if !conditions.is_file() {
            return Err(AppError::MissingProfileFile {
                what: "initial_conditions.md",
                path: conditions,
            });
        }

        let chain_path = inputs.join(format!("{name}.json"));
        if !chain_path.is_file() {
            return Err(AppError::MissingProfileFile {
                what: "prompt chain JSON",
                path: chain_path,
            });
        }
        let content = fs::read_to_string(&chain_path)?;
        let input = ProfileInput::parse(&content, &chain_path)?;

        fs::create_dir_all(&outputs)?;

        Ok(PlatformInfo { inputs_path: inputs, outputs_path: outputs, lang: input.lang })
    }
}

/// Profile names are snake_case `first_last`.
pub fn is_valid_profile_name(name: &str) -> bool {
    let mut parts = name.split('_');
    let (Some(first), Some(last), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    [first, last].into_iter().all(|part| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
            && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    })
}

/// Accepts `xx` or `xx-XX` language tags.
pub fn is_valid_lang(lang: &str) -> bool {
    let bytes = lang.as_bytes();
    match bytes.len() {
        2 => bytes.iter().all(|b| b.is_ascii_lowercase()),
        5 => {
            bytes[..2].iter().all(|b| b.is_ascii_lowercase())
                && bytes[2] == b'-'
                && bytes[3..].iter().all(|b| b.is_ascii_uppercase())
        }
        _ => false,
    }
}
