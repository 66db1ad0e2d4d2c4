//! Planning stage: runs a profile's prompt chain and writes the calendar.
//!
//! Each chain step renders its prompt and system prompt against the cache of
//! earlier outputs plus a few built-ins (`previous_storyline`, `lang`, `day`,
//! `monday`), then stores its reply under its `cache_key`. The final step must
//! yield the week calendar as JSON.

use std::fs;

use chrono::{Datelike, Days, NaiveDate};

use crate::domain::profile::INITIAL_CONDITIONS_FILE;
use crate::domain::prompt::{decode_json_reply, render_template};
use crate::domain::{AppError, Planning, Platform, Profile, ProfileInput, PromptContext};
use crate::ports::{ChatModel, ChatRequest};

pub struct Planner<'a, M: ChatModel> {
    model: &'a mut M,
}

impl<'a, M: ChatModel> Planner<'a, M> {
    pub fn new(model: &'a mut M) -> Self {
        Self { model }
    }

    /// Run the chain for one profile/platform and persist the planning file.
    ///
    /// With `fresh` set the previous storyline is withheld from the chain, so
    /// the persona starts over.
    pub fn plan(
        &mut self,
        profile: &Profile,
        platform: Platform,
        today: NaiveDate,
        fresh: bool,
    ) -> Result<Planning, AppError> {
        let info = profile.platform(platform)?;
        let chain_path = info.inputs_path.join(format!("{}.json", profile.name));
        let input = ProfileInput::parse(&fs::read_to_string(&chain_path)?, &chain_path)?;

        let storyline = if fresh {
            String::new()
        } else {
            fs::read_to_string(info.inputs_path.join(INITIAL_CONDITIONS_FILE))?
        };
        let mut context = PromptContext::new()
            .with_var("previous_storyline", storyline.trim())
            .with_var("lang", &input.lang)
            .with_var("day", today.weekday().to_string())
            .with_var("monday", upcoming_monday(today).to_string());

        let mut calendar_reply = String::new();
        for (index, item) in input.prompts.iter().enumerate() {
            let step = format!("{}#{}", chain_path.display(), index);
            let request = ChatRequest {
                system_prompt: Some(render_template(&item.system_prompt, &context, &step)?),
                prompt: render_template(&item.prompt, &context, &step)?,
                as_json: item.output_as_json,
                sensitive: item.is_sensitive_content,
            };

            println!("🧠 [{profile}/{platform}] step {}/{}", index + 1, input.prompts.len());
            let reply = self.model.complete(&request)?;

            let cached = if item.output_as_json {
                // normalize before caching so later templates interpolate
                // clean JSON
                decode_json_reply(&reply)?.to_string()
            } else {
                reply.trim().to_string()
            };
            context.insert(&item.cache_key, &cached);
            calendar_reply = cached;
        }

        let planning: Planning = serde_json::from_value(decode_json_reply(&calendar_reply)?)
            .map_err(|err| AppError::CalendarDecode(err.to_string()))?;
        if planning.is_empty() {
            return Err(AppError::CalendarDecode("calendar has no weeks".into()));
        }

        planning.save(&profile.planning_path(platform)?)?;
        Ok(planning)
    }
}

/// Date of the next Monday strictly after `today`, unless `today` already is
/// one.
pub fn upcoming_monday(today: NaiveDate) -> NaiveDate {
    let offset = today.weekday().num_days_from_monday();
    let ahead = if offset == 0 { 0 } else { 7 - offset };
    today.checked_add_days(Days::new(ahead.into())).unwrap_or(today)
}
