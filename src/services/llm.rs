//! OpenAI-compatible chat-completions client with model fallback.
//!
//! Speaks the `/chat/completions` dialect shared by api.openai.com and the
//! GitHub Models endpoint. A preferred-model list is walked in order: a
//! rate-limited model is marked exhausted for the rest of the process, a
//! content-filtered or refusing model is skipped for the current request,
//! and transient transport failures get bounded exponential backoff.
//! Sensitive requests skip the models listed as censored outright instead of
//! burning a round trip on a guaranteed refusal.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use url::Url;

use crate::domain::AppError;
use crate::ports::{ChatModel, ChatRequest};
use crate::services::ApiTuning;

/// Replies containing these phrases are treated as refusals and routed to the
/// next preferred model.
const CANNOT_ASSIST_PHRASES: [&str; 3] =
    ["i can't assist", "i cannot assist", "i'm sorry, but i can't"];

/// Cap on "continue where we left off" follow-ups for truncated replies.
const MAX_CONTINUATIONS: u32 = 3;

#[derive(Debug, Clone)]
pub struct ChatClient {
    base_url: Url,
    api_key: String,
    preferred_models: Vec<String>,
    censored_models: HashSet<String>,
    exhausted: HashSet<String>,
    tuning: ApiTuning,
    client: Client,
}

#[derive(Debug, Serialize)]
struct Message {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Outcome of a single model attempt, before fallback decisions.
enum Attempt {
    Reply { content: String, finish_reason: Option<String> },
    RateLimited,
    ContentFiltered,
    Failed(String),
}

impl ChatClient {
    pub fn new(
        base_url: Url,
        api_key: String,
        preferred_models: Vec<String>,
        censored_models: Vec<String>,
        tuning: &ApiTuning,
    ) -> Result<Self, AppError> {
        if preferred_models.is_empty() {
            return Err(AppError::config_error("preferred model list is empty"));
        }
        let client = Client::builder()
            .timeout(Duration::from_secs(tuning.timeout_secs))
            .build()
            .map_err(|e| AppError::config_error(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            api_key,
            preferred_models,
            censored_models: censored_models.into_iter().collect(),
            exhausted: HashSet::new(),
            tuning: tuning.clone(),
            client,
        })
    }

    fn completions_url(&self) -> Result<Url, AppError> {
        self.base_url
            .join("chat/completions")
            .map_err(|e| AppError::config_error(format!("Invalid LLM base URL: {e}")))
    }

    fn send(&self, model: &str, messages: &[Message], as_json: bool) -> Attempt {
        let body = CompletionRequest {
            model,
            messages,
            response_format: as_json.then_some(ResponseFormat { kind: "json_object" }),
        };
        let url = match self.completions_url() {
            Ok(url) => url,
            Err(err) => return Attempt::Failed(err.to_string()),
        };

        let mut last_failure = String::new();
        for attempt in 0..self.tuning.max_retries.max(1) {
            if attempt > 0 {
                std::thread::sleep(Duration::from_millis(self.tuning.backoff_ms(attempt)));
            }

            let response = match self
                .client
                .post(url.clone())
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
            {
                Ok(response) => response,
                Err(err) => {
                    last_failure = format!("transport error: {err}");
                    continue;
                }
            };

            let status = response.status();
            if status.as_u16() == 429 {
                return Attempt::RateLimited;
            }
            if status.is_server_error() {
                last_failure = format!("server error ({})", status.as_u16());
                continue;
            }
            if !status.is_success() {
                let text = response.text().unwrap_or_else(|_| "unknown error".into());
                if text.contains("content_filter") {
                    return Attempt::ContentFiltered;
                }
                return Attempt::Failed(format!("API error ({}): {text}", status.as_u16()));
            }

            let parsed: CompletionResponse = match response.json() {
                Ok(parsed) => parsed,
                Err(err) => return Attempt::Failed(format!("malformed response: {err}")),
            };
            let Some(choice) = parsed.choices.into_iter().next() else {
                return Attempt::Failed("response carried no choices".into());
            };
            if choice.finish_reason.as_deref() == Some("content_filter") {
                return Attempt::ContentFiltered;
            }
            return Attempt::Reply {
                content: choice.message.content.unwrap_or_default(),
                finish_reason: choice.finish_reason,
            };
        }
        Attempt::Failed(last_failure)
    }

    /// Run one request against a model, following `length` truncations with
    /// continuation turns.
    fn complete_with_model(&self, model: &str, request: &ChatRequest) -> Attempt {
        let mut messages = Vec::new();
        if let Some(system) = &request.system_prompt {
            messages.push(Message { role: "system", content: system.clone() });
        }
        messages.push(Message { role: "user", content: request.prompt.clone() });

        let mut reply = String::new();
        for _ in 0..=MAX_CONTINUATIONS {
            match self.send(model, &messages, request.as_json) {
                Attempt::Reply { content, finish_reason } => {
                    reply.push_str(&content);
                    if finish_reason.as_deref() == Some("length") {
                        messages.push(Message { role: "assistant", content });
                        messages.push(Message {
                            role: "user",
                            content: "Continue EXACTLY where we left off".into(),
                        });
                        continue;
                    }
                    return Attempt::Reply { content: reply, finish_reason };
                }
                other => return other,
            }
        }
        Attempt::Failed(format!("model {model} kept truncating after {MAX_CONTINUATIONS} continuations"))
    }
}

impl ChatModel for ChatClient {
    fn complete(&mut self, request: &ChatRequest) -> Result<String, AppError> {
        let models: Vec<String> = self
            .preferred_models
            .iter()
            .filter(|model| !self.exhausted.contains(*model))
            .filter(|model| !request.sensitive || !self.censored_models.contains(*model))
            .cloned()
            .collect();

        let mut last_failure = if models.is_empty() && request.sensitive {
            String::from("every preferred model is censored; sensitive prompts need an uncensored entry")
        } else {
            String::from("all preferred models exhausted")
        };
        for model in models {
            match self.complete_with_model(&model, request) {
                Attempt::Reply { content, .. } => {
                    if is_refusal(&content) {
                        println!("⚠️  Model {model} refused the request, trying next model");
                        last_failure = format!("model {model} refused the request");
                        continue;
                    }
                    return Ok(content);
                }
                Attempt::RateLimited => {
                    println!("⚠️  Model {model} rate limited, marking exhausted");
                    self.exhausted.insert(model.clone());
                    last_failure = format!("model {model} rate limited");
                }
                Attempt::ContentFiltered => {
                    println!("⚠️  Content filter triggered for {model}, trying next model");
                    last_failure = format!("model {model} content-filtered the request");
                }
                Attempt::Failed(details) => return Err(AppError::api("LLM", details)),
            }
        }
        Err(AppError::ModelsExhausted(last_failure))
    }
}

fn is_refusal(reply: &str) -> bool {
    let lowered = reply.to_lowercase();
    CANNOT_ASSIST_PHRASES.iter().any(|phrase| lowered.contains(phrase))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(server: &mockito::Server, models: &[&str]) -> ChatClient {
        client_with_censored(server, models, &[])
    }

    fn client_with_censored(
        server: &mockito::Server,
        models: &[&str],
        censored: &[&str],
    ) -> ChatClient {
        ChatClient::new(
            Url::parse(&format!("{}/", server.url())).unwrap(),
            "fake-key".into(),
            models.iter().map(|m| m.to_string()).collect(),
            censored.iter().map(|m| m.to_string()).collect(),
            &ApiTuning::fast(),
        )
        .unwrap()
    }

    fn reply_body(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"content": content}, "finish_reason": "stop"}]
        })
        .to_string()
    }

    #[test]
    fn completes_with_first_model() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "gpt-4o"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(reply_body("hello"))
            .create();

        let mut chat = client(&server, &["gpt-4o"]);
        let reply = chat.complete(&ChatRequest::text("hi")).unwrap();
        assert_eq!(reply, "hello");
        mock.assert();
    }

    #[test]
    fn rate_limited_model_is_exhausted_and_next_used() {
        let mut server = mockito::Server::new();
        let limited = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "gpt-4o"})))
            .with_status(429)
            .expect(1)
            .create();
        let fallback = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "llama-3"})))
            .with_status(200)
            .with_body(reply_body("fallback"))
            .expect(2)
            .create();

        let mut chat = client(&server, &["gpt-4o", "llama-3"]);
        assert_eq!(chat.complete(&ChatRequest::text("hi")).unwrap(), "fallback");
        // second request goes straight to the fallback model
        assert_eq!(chat.complete(&ChatRequest::text("again")).unwrap(), "fallback");
        limited.assert();
        fallback.assert();
    }

    #[test]
    fn retries_server_errors_then_fails() {
        let mut server = mockito::Server::new();
        let mock = server.mock("POST", "/chat/completions").with_status(500).expect(3).create();

        let mut chat = client(&server, &["gpt-4o"]);
        let err = chat.complete(&ChatRequest::text("hi")).unwrap_err();
        assert!(matches!(err, AppError::Api { .. }));
        mock.assert();
    }

    #[test]
    fn refusal_falls_through_to_next_model() {
        let mut server = mockito::Server::new();
        let refusing = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "strict"})))
            .with_status(200)
            .with_body(reply_body("I'm sorry, but I can't help with that."))
            .create();
        let helpful = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "open"})))
            .with_status(200)
            .with_body(reply_body("sure thing"))
            .create();

        let mut chat = client(&server, &["strict", "open"]);
        assert_eq!(chat.complete(&ChatRequest::text("hi")).unwrap(), "sure thing");
        refusing.assert();
        helpful.assert();
    }

    #[test]
    fn length_finish_reason_triggers_continuation() {
        let mut server = mockito::Server::new();
        let truncated = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(
                serde_json::json!({"messages": [{"role": "user", "content": "hi"}]}),
            ))
            .with_status(200)
            .with_body(
                serde_json::json!({
                    "choices": [{"message": {"content": "part one "}, "finish_reason": "length"}]
                })
                .to_string(),
            )
            .create();
        let continued = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "messages": [
                    {"role": "user", "content": "hi"},
                    {"role": "assistant", "content": "part one "},
                    {"role": "user", "content": "Continue EXACTLY where we left off"}
                ]
            })))
            .with_status(200)
            .with_body(reply_body("part two"))
            .create();

        let mut chat = client(&server, &["gpt-4o"]);
        assert_eq!(chat.complete(&ChatRequest::text("hi")).unwrap(), "part one part two");
        truncated.assert();
        continued.assert();
    }

    #[test]
    fn sensitive_request_skips_censored_models() {
        let mut server = mockito::Server::new();
        let censored = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "strict"})))
            .expect(0)
            .create();
        let open = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({"model": "open"})))
            .with_status(200)
            .with_body(reply_body("spicy reply"))
            .create();

        let mut chat = client_with_censored(&server, &["strict", "open"], &["strict"]);
        let request = ChatRequest { sensitive: true, ..ChatRequest::text("hi") };
        assert_eq!(chat.complete(&request).unwrap(), "spicy reply");
        censored.assert();
        open.assert();
    }

    #[test]
    fn sensitive_request_with_only_censored_models_is_an_error() {
        let server = mockito::Server::new();
        let mut chat = client_with_censored(&server, &["strict"], &["strict"]);
        let request = ChatRequest { sensitive: true, ..ChatRequest::text("hi") };
        let err = chat.complete(&request).unwrap_err();
        assert!(err.to_string().contains("censored"));
    }

    #[test]
    fn all_models_exhausted_is_reported() {
        let mut server = mockito::Server::new();
        server.mock("POST", "/chat/completions").with_status(429).expect(2).create();

        let mut chat = client(&server, &["a", "b"]);
        let err = chat.complete(&ChatRequest::text("hi")).unwrap_err();
        assert!(matches!(err, AppError::ModelsExhausted(_)));
    }
}
