//! Normalization shared by every adapter: system-prompt placement, passthrough
//! merging, token-usage mapping, and error wrapping parameterized by the field
//! names each backend uses. Keeping these in one place stops the same
//! extraction logic from drifting apart per adapter.

use std::borrow::Cow;
use std::collections::HashMap;

use futures_util::StreamExt;
use serde_json::{Map, Value};

use crate::error::{LlmError, STATUS_UNCLASSIFIED};
use crate::http::{HttpBodyStream, HttpResponse};
use crate::types::{LlmOptions, Message, Role, TokenUsage};

/// Prepends `options.system_prompt` as a synthetic leading system message if and
/// only if the sequence contains no system message already. The caller's slice
/// is never mutated; the synthetic message is request-scoped and never written
/// back into stored history.
pub(crate) fn with_system_prompt<'a>(
    messages: &'a [Message],
    options: &LlmOptions,
) -> Cow<'a, [Message]> {
    let Some(prompt) = options.system_prompt.as_deref() else {
        return Cow::Borrowed(messages);
    };
    if prompt.is_empty() || messages.iter().any(|m| m.role == Role::System) {
        return Cow::Borrowed(messages);
    }
    let mut augmented = Vec::with_capacity(messages.len() + 1);
    augmented.push(Message::system(prompt));
    augmented.extend_from_slice(messages);
    Cow::Owned(augmented)
}

/// Splits the sequence for backends that take system instructions as a
/// dedicated top-level parameter. System-role messages are joined into the
/// returned instruction text and excluded from the remaining list, so they are
/// never sent both ways. When the history carries no system message,
/// `options.system_prompt` supplies the instruction instead.
pub(crate) fn extract_system<'a>(
    messages: &'a [Message],
    options: &LlmOptions,
) -> (Option<String>, Vec<&'a Message>) {
    let mut system_texts: Vec<&str> = Vec::new();
    let mut rest = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            Role::System => system_texts.push(&message.content),
            _ => rest.push(message),
        }
    }

    let system = if system_texts.is_empty() {
        options
            .system_prompt
            .as_deref()
            .filter(|p| !p.is_empty())
            .map(str::to_string)
    } else {
        Some(system_texts.join("\n\n"))
    };

    (system, rest)
}

/// Merges the passthrough map into an outgoing body verbatim. Known fields are
/// set by name before this runs, so a passthrough key can only describe knobs
/// the common contract does not model.
pub(crate) fn merge_passthrough(body: &mut Map<String, Value>, extra: &HashMap<String, Value>) {
    for (key, value) in extra {
        body.insert(key.clone(), value.clone());
    }
}

/// Builds a [`TokenUsage`] from whatever counters the backend reported.
/// Returns `None` when nothing was reported; absent counters stay `None` and
/// are never derived from the ones that are present.
pub(crate) fn usage(
    prompt_tokens: Option<u64>,
    completion_tokens: Option<u64>,
    total_tokens: Option<u64>,
) -> Option<TokenUsage> {
    if prompt_tokens.is_none() && completion_tokens.is_none() && total_tokens.is_none() {
        return None;
    }
    Some(TokenUsage {
        prompt_tokens,
        completion_tokens,
        total_tokens,
    })
}

/// Walks a JSON value along `path`, returning the leaf if every key exists.
fn lookup<'v>(value: &'v Value, path: &[&str]) -> Option<&'v Value> {
    let mut current = value;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

/// Wraps a non-2xx backend body into an [`LlmError::Api`].
///
/// `message_paths` lists where the backend puts its human-readable message,
/// tried in order (for example `["error", "message"]` for the hosted APIs and
/// `["error"]` for local servers). The parsed body, or the raw text when it is
/// not JSON, is preserved in the error's details bag.
pub(crate) fn wrap_error(
    provider: &'static str,
    status: u16,
    body: &str,
    message_paths: &[&[&str]],
) -> LlmError {
    tracing::warn!(provider, status, "backend call failed");
    if let Ok(parsed) = serde_json::from_str::<Value>(body) {
        let message = message_paths
            .iter()
            .find_map(|path| lookup(&parsed, path))
            .and_then(|v| v.as_str())
            .map(str::to_string)
            .unwrap_or_else(|| format!("status {status}: {body}"));
        return LlmError::api_with_details(provider, status, message, parsed);
    }
    LlmError::api(provider, status, format!("status {status}: {body}"))
}

/// Decodes a buffered response, classifying non-2xx statuses through
/// [`wrap_error`].
pub(crate) fn expect_success(
    response: HttpResponse,
    provider: &'static str,
    message_paths: &[&[&str]],
) -> Result<String, LlmError> {
    let status = response.status;
    let text = response.into_string()?;
    if (200..300).contains(&status) {
        Ok(text)
    } else {
        Err(wrap_error(provider, status, &text, message_paths))
    }
}

/// Collects the body of a failed streaming request so it can be classified the
/// same way as a buffered error response.
pub(crate) async fn drain_error_body(
    mut body: HttpBodyStream,
    provider: &'static str,
) -> Result<String, LlmError> {
    let mut bytes = Vec::new();
    while let Some(chunk) = body.next().await {
        bytes.extend_from_slice(&chunk?);
    }
    String::from_utf8(bytes).map_err(|err| {
        LlmError::api(
            provider,
            STATUS_UNCLASSIFIED,
            format!("failed to decode stream error body: {err}"),
        )
    })
}

/// Maps a malformed backend payload to an [`LlmError::Api`].
pub(crate) fn parse_failure(provider: &'static str, what: &str, err: serde_json::Error) -> LlmError {
    LlmError::api(
        provider,
        STATUS_UNCLASSIFIED,
        format!("failed to parse {what}: {err}"),
    )
}
