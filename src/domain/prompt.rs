//! Prompt-chain rendering and model-output decoding.
//!
//! Templates use strict Jinja-compatible interpolation: every `{{variable}}`
//! must resolve against the chain cache, and control structures are rejected
//! outright. Model replies that should be JSON are tolerated with markdown
//! fences and trailing commas, which smaller models emit routinely.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use minijinja::{Environment, UndefinedBehavior};

use crate::domain::AppError;

/// Accumulated outputs of earlier chain steps plus built-in variables.
#[derive(Debug, Clone, Default)]
pub struct PromptContext {
    variables: BTreeMap<String, String>,
}

impl PromptContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.variables.insert(name.into(), value.into());
    }
}

static ENV: OnceLock<Environment<'static>> = OnceLock::new();

/// Render a prompt template against the chain context.
///
/// Only `{{ ... }}` interpolation is allowed; undefined variables fail.
pub fn render_template(
    template: &str,
    context: &PromptContext,
    template_name: &str,
) -> Result<String, AppError> {
    for token in ["{%", "{#"] {
        if template.contains(token) {
            return Err(AppError::TemplateSyntaxNotAllowed {
                template: template_name.to_string(),
                token: if token == "{%" { "{%" } else { "{#" },
            });
        }
    }

    let env = ENV.get_or_init(|| {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env
    });

    env.render_str(template, &context.variables).map_err(|err| AppError::TemplateRender {
        template: template_name.to_string(),
        reason: err.to_string(),
    })
}

/// Decode a JSON object from a model reply.
///
/// Strips a surrounding ```json fence, stray wrapping quotes, and trailing
/// commas before closing brackets.
pub fn decode_json_reply(message: &str) -> Result<serde_json::Value, AppError> {
    let cleaned = strip_trailing_commas(strip_code_fence(message).trim_matches('"'));
    serde_json::from_str(&cleaned).map_err(|err| AppError::CalendarDecode(err.to_string()))
}

fn strip_code_fence(message: &str) -> &str {
    let trimmed = message.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json", "JSON", or empty)
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphanumeric());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Remove commas directly preceding `}` or `]`, outside string literals.
fn strip_trailing_commas(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut in_string = false;
    let mut escaped = false;
    let bytes: Vec<char> = input.chars().collect();

    for (i, &c) in bytes.iter().enumerate() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }
        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            ',' => {
                let next = bytes[i + 1..].iter().find(|ch| !ch.is_whitespace());
                if !matches!(next, Some('}') | Some(']')) {
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}
