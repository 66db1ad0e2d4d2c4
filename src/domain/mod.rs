//! Pure domain types: profiles, calendars, publications, prompt handling.

mod error;
pub mod planning;
mod platform;
pub mod profile;
pub mod prompt;
pub mod publication;

pub use error::AppError;
pub use planning::{ImageSpec, PlannedDay, PlannedPost, Planning};
pub use platform::Platform;
pub use profile::{PlatformInfo, Profile, ProfileInput, ProfileStore, PromptItem};
pub use prompt::PromptContext;
pub use publication::Publication;
