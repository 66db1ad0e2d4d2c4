use serde::{Deserialize, Serialize};

/// Publishing platforms driven by the calendar pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Meta,
    Fanvue,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Meta, Platform::Fanvue];

    /// Directory name under a profile root.
    pub fn dir_name(&self) -> &'static str {
        match self {
            Platform::Meta => "meta",
            Platform::Fanvue => "fanvue",
        }
    }

    pub fn from_dir_name(name: &str) -> Option<Platform> {
        match name.to_ascii_lowercase().as_str() {
            "meta" => Some(Platform::Meta),
            "fanvue" => Some(Platform::Fanvue),
            _ => None,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.dir_name())
    }
}

impl std::str::FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Platform::from_dir_name(s)
            .ok_or_else(|| format!("unknown platform '{s}' (expected 'meta' or 'fanvue')"))
    }
}
