//! Conversions between toolchat history types and genai types
//!
//! Each history entry becomes one or more genai chat messages: user text,
//! assistant text, assistant tool calls, and tool responses keyed by call id.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use genai::chat::{
    ChatMessage as GenaiMessage, ChatOptions as GenaiOptions, Tool as GenaiTool,
    ToolCall as GenaiToolCall, ToolResponse as GenaiToolResponse,
};
use genai::resolver::{AuthData, AuthResolver};
use genai::{Client, ModelIden};
use serde_json::json;

use crate::logging::Logger;
use crate::types::{Content, FunctionCall, FunctionDeclaration, Part, Role};

use super::traits::GenerateOptions;

// ============================================================================
// History Conversion: toolchat -> genai
// ============================================================================

/// Call id used on the wire; calls without one get a name-derived id
pub fn wire_call_id(id: Option<&str>, name: &str) -> String {
    match id {
        Some(id) if !id.is_empty() => id.to_string(),
        _ => format!("call_{}", name),
    }
}

fn to_genai_tool_call(call: &FunctionCall) -> Result<GenaiToolCall, serde_json::Error> {
    serde_json::from_value(json!({
        "call_id": wire_call_id(call.id.as_deref(), &call.name),
        "fn_name": call.name,
        "fn_arguments": call.args,
    }))
}

/// Calls of a model entry that `next` answers, in part order.
///
/// History keeps every call the model asked for, but only the first one is
/// executed; providers reject assistant tool calls left without a response.
pub(crate) fn answered_calls<'a>(entry: &'a Content, next: Option<&Content>) -> Vec<&'a FunctionCall> {
    let answered: HashSet<String> = next
        .filter(|n| n.role == Role::Tool)
        .map(|n| {
            n.parts
                .iter()
                .filter_map(Part::as_function_response)
                .map(|r| wire_call_id(r.id.as_deref(), &r.name))
                .collect()
        })
        .unwrap_or_default();

    entry
        .function_calls()
        .filter(|call| answered.contains(&wire_call_id(call.id.as_deref(), &call.name)))
        .collect()
}

/// Convert one history entry to genai messages; `next` is the entry after it
pub fn to_genai_entry(entry: &Content, next: Option<&Content>, logger: &dyn Logger) -> Vec<GenaiMessage> {
    let mut messages = Vec::new();

    match entry.role {
        Role::User => {
            if let Some(text) = entry.text() {
                messages.push(GenaiMessage::user(text));
            }
        }
        Role::Model => {
            if let Some(text) = entry.text() {
                messages.push(GenaiMessage::assistant(text));
            }
            let replayed = answered_calls(entry, next);
            let skipped = entry.function_calls().count() - replayed.len();
            if skipped > 0 {
                logger.debug(&format!(
                    "[GenaiBackend] Not replaying {} unanswered function calls",
                    skipped
                ));
            }
            let calls: Vec<GenaiToolCall> = replayed
                .into_iter()
                .filter_map(|call| match to_genai_tool_call(call) {
                    Ok(tc) => Some(tc),
                    Err(e) => {
                        logger.warn(&format!(
                            "[GenaiBackend] Dropping function call '{}': {}",
                            call.name, e
                        ));
                        None
                    }
                })
                .collect();
            if !calls.is_empty() {
                messages.push(GenaiMessage::from(calls));
            }
        }
        Role::Tool => {
            for part in &entry.parts {
                match part {
                    Part::FunctionResponse(resp) => {
                        let call_id = wire_call_id(resp.id.as_deref(), &resp.name);
                        messages.push(GenaiMessage::from(GenaiToolResponse::new(
                            call_id,
                            resp.response.to_string(),
                        )));
                    }
                    Part::Text { text } => messages.push(GenaiMessage::user(text.clone())),
                    Part::FunctionCall(_) => {}
                }
            }
        }
    }

    messages
}

/// Convert a history, prefixed by an optional system instruction
pub fn to_genai_messages(
    history: &[Content],
    system_instruction: Option<&str>,
    logger: &dyn Logger,
) -> Vec<GenaiMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    if let Some(system) = system_instruction.filter(|s| !s.trim().is_empty()) {
        messages.push(GenaiMessage::system(system));
    }
    for (i, entry) in history.iter().enumerate() {
        messages.extend(to_genai_entry(entry, history.get(i + 1), logger));
    }
    messages
}

// ============================================================================
// Tool Conversion: toolchat -> genai
// ============================================================================

/// Convert a function declaration to a genai Tool
pub fn to_genai_tool(decl: &FunctionDeclaration) -> GenaiTool {
    let mut tool = GenaiTool::new(&decl.name).with_description(&decl.description);

    if let Some(schema) = &decl.parameters {
        tool = tool.with_schema(schema.clone());
    }

    tool
}

pub fn to_genai_tools(declarations: &[FunctionDeclaration]) -> Vec<GenaiTool> {
    declarations.iter().map(to_genai_tool).collect()
}

// ============================================================================
// Options Conversion: toolchat -> genai
// ============================================================================

pub fn to_genai_options(options: &GenerateOptions) -> GenaiOptions {
    let mut genai_opts = GenaiOptions::default();

    if let Some(temp) = options.temperature {
        genai_opts = genai_opts.with_temperature(temp as f64);
    }

    if let Some(max_tokens) = options.max_tokens {
        genai_opts = genai_opts.with_max_tokens(max_tokens);
    }

    // Tool calls arrive on the End event only when captured
    genai_opts.with_capture_tool_calls(true)
}

// ============================================================================
// Response Conversion: genai -> toolchat
// ============================================================================

pub fn from_genai_tool_call(tc: &GenaiToolCall) -> FunctionCall {
    FunctionCall::new(tc.fn_name.clone(), tc.fn_arguments.clone()).with_id(tc.call_id.clone())
}

/// Assemble the model entry from streamed text and captured tool calls.
///
/// Returns `None` when the model produced nothing at all.
pub fn to_model_entry(text: String, calls: Vec<FunctionCall>) -> Option<Content> {
    let mut parts = Vec::with_capacity(calls.len() + 1);
    if !text.is_empty() {
        parts.push(Part::text(text));
    }
    parts.extend(calls.into_iter().map(Part::FunctionCall));

    if parts.is_empty() {
        None
    } else {
        Some(Content::new(Role::Model, parts))
    }
}

// ============================================================================
// Client Creation
// ============================================================================

/// Create a genai Client.
///
/// An explicit key is handed to genai through an auth resolver; without one
/// genai's own environment lookup applies.
pub fn create_client(api_key: Option<String>) -> Client {
    let Some(key) = api_key else {
        return Client::default();
    };

    let auth_resolver = AuthResolver::from_resolver_async_fn(
        move |_model_iden: ModelIden| -> Pin<Box<dyn Future<Output = genai::resolver::Result<Option<AuthData>>> + Send>> {
            let key = key.clone();
            Box::pin(async move { Ok(Some(AuthData::from_single(key))) })
        },
    );

    Client::builder().with_auth_resolver(auth_resolver).build()
}
