use std::sync::OnceLock;

use flow_core::ExtractedItem;
use flow_core::Priority;
use regex::Regex;
use serde_json::Value;
use tracing::info;
use tracing::warn;

use crate::adapters::build_extraction_prompt;
use crate::adapters::provider_command;
use crate::adapters::run_with_timeout;
use crate::contracts::ExtractionRequest;
use crate::error::ExtractError;

/// Turns free text into proposed tasks.
pub trait TaskExtractor: Send + Sync {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedItem>, ExtractError>;
}

/// Shells out to the configured provider CLI.
#[derive(Debug, Clone, Default)]
pub struct CliTaskExtractor {
    request: ExtractionRequest,
}

impl CliTaskExtractor {
    pub fn new(request: ExtractionRequest) -> Self {
        Self { request }
    }

    pub fn request(&self) -> &ExtractionRequest {
        &self.request
    }
}

impl TaskExtractor for CliTaskExtractor {
    fn extract(&self, text: &str) -> Result<Vec<ExtractedItem>, ExtractError> {
        let provider = self.request.provider.label();
        info!(provider, model = %self.request.model, "requesting task extraction");
        let prompt = build_extraction_prompt(text);
        let cmd = provider_command(&self.request, &prompt);
        let raw = run_with_timeout(cmd, provider, self.request.timeout)?;
        let items = parse_extraction(&raw)?;
        info!(provider, count = items.len(), "extraction parsed");
        Ok(items)
    }
}

/// Returns a fixed answer. Used offline and in tests.
#[derive(Debug, Clone)]
pub struct StaticTaskExtractor {
    response: Result<Vec<ExtractedItem>, String>,
}

impl StaticTaskExtractor {
    pub fn items(items: Vec<ExtractedItem>) -> Self {
        Self { response: Ok(items) }
    }

    pub fn failing(reason: impl Into<String>) -> Self {
        Self {
            response: Err(reason.into()),
        }
    }
}

impl TaskExtractor for StaticTaskExtractor {
    fn extract(&self, _text: &str) -> Result<Vec<ExtractedItem>, ExtractError> {
        self.response.clone().map_err(ExtractError::Parse)
    }
}

fn fence_pattern() -> Option<&'static Regex> {
    static FENCE: OnceLock<Option<Regex>> = OnceLock::new();
    FENCE
        .get_or_init(|| Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)```").ok())
        .as_ref()
}

fn unfence(raw: &str) -> &str {
    fence_pattern()
        .and_then(|re| re.captures(raw))
        .and_then(|caps| caps.get(1))
        .map_or(raw, |m| m.as_str())
        .trim()
}

/// Parses a provider answer into items.
///
/// The body must be a JSON array, optionally inside a Markdown code fence.
/// When it is not, the outermost `[...]` span is tried before giving up.
/// Elements without a string `title` are skipped; an unknown priority
/// becomes `None`.
pub fn parse_extraction(raw: &str) -> Result<Vec<ExtractedItem>, ExtractError> {
    let body = unfence(raw);
    if body.is_empty() {
        return Err(ExtractError::Parse("empty body".to_string()));
    }

    let value = match serde_json::from_str::<Value>(body) {
        Ok(value) => value,
        Err(first) => match (body.find('['), body.rfind(']')) {
            (Some(start), Some(end)) if start < end => {
                serde_json::from_str::<Value>(&body[start..=end])
                    .map_err(|_| ExtractError::Parse(first.to_string()))?
            }
            _ => return Err(ExtractError::Parse(first.to_string())),
        },
    };

    let Value::Array(elements) = value else {
        return Err(ExtractError::Parse("expected a JSON array".to_string()));
    };

    let mut items = Vec::with_capacity(elements.len());
    for (idx, element) in elements.iter().enumerate() {
        let Some(title) = element
            .get("title")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|title| !title.is_empty())
        else {
            warn!(index = idx, "skipping extracted item without a title");
            continue;
        };
        let priority = element
            .get("priority")
            .and_then(Value::as_str)
            .and_then(Priority::parse);
        items.push(ExtractedItem::new(title, priority));
    }
    Ok(items)
}
