//! Conversation history types
//!
//! A history is an append-only `Vec<Content>`. Each entry has a role and one
//! or more parts; parts are tagged by `kind` when serialized so a stored
//! history round-trips without loss.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Who produced a history entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
    /// Result of a tool invocation fed back to the model
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Model => write!(f, "model"),
            Role::Tool => write!(f, "tool"),
        }
    }
}

/// A model-issued request to invoke a tool
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionCall {
    /// Provider call id, when the backend assigns one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub args: Value,
}

impl FunctionCall {
    pub fn new(name: impl Into<String>, args: Value) -> Self {
        Self {
            id: None,
            name: name.into(),
            args,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Result (or structured error) of a tool invocation, as shown to the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionResponse {
    /// Echoes the id of the call this answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// `{"content": ...}` on success, `{"error": ...}` on failure
    pub response: Value,
}

impl FunctionResponse {
    /// Successful tool output
    pub fn success(call: &FunctionCall, content: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: json!({ "content": content.into() }),
        }
    }

    /// Structured error the model can read and recover from
    pub fn error(call: &FunctionCall, message: impl Into<String>) -> Self {
        Self {
            id: call.id.clone(),
            name: call.name.clone(),
            response: json!({ "error": message.into() }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.response.get("error").is_some()
    }

    pub fn error_message(&self) -> Option<&str> {
        self.response.get("error").and_then(Value::as_str)
    }

    pub fn content(&self) -> Option<&str> {
        self.response.get("content").and_then(Value::as_str)
    }
}

/// One piece of a history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Part {
    Text { text: String },
    FunctionCall(FunctionCall),
    FunctionResponse(FunctionResponse),
}

impl Part {
    pub fn text(text: impl Into<String>) -> Self {
        Part::Text { text: text.into() }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Part::Text { text } => Some(text),
            _ => None,
        }
    }

    pub fn as_function_call(&self) -> Option<&FunctionCall> {
        match self {
            Part::FunctionCall(call) => Some(call),
            _ => None,
        }
    }

    pub fn as_function_response(&self) -> Option<&FunctionResponse> {
        match self {
            Part::FunctionResponse(resp) => Some(resp),
            _ => None,
        }
    }
}

/// A single history entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    pub role: Role,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn new(role: Role, parts: Vec<Part>) -> Self {
        Self { role, parts }
    }

    /// User prompt entry
    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, vec![Part::text(text)])
    }

    /// Model entry holding plain text
    pub fn model_text(text: impl Into<String>) -> Self {
        Self::new(Role::Model, vec![Part::text(text)])
    }

    /// Model entry requesting a single function call
    pub fn model_call(call: FunctionCall) -> Self {
        Self::new(Role::Model, vec![Part::FunctionCall(call)])
    }

    /// Tool-result entry wrapping one function response
    pub fn tool_response(response: FunctionResponse) -> Self {
        Self::new(Role::Tool, vec![Part::FunctionResponse(response)])
    }

    /// Concatenated text parts, `None` when the entry carries no text
    pub fn text(&self) -> Option<String> {
        let texts: Vec<&str> = self
            .parts
            .iter()
            .filter_map(Part::as_text)
            .filter(|t| !t.is_empty())
            .collect();
        if texts.is_empty() {
            None
        } else {
            Some(texts.join(""))
        }
    }

    /// First function call in part order
    pub fn first_function_call(&self) -> Option<&FunctionCall> {
        self.parts.iter().find_map(Part::as_function_call)
    }

    pub fn function_calls(&self) -> impl Iterator<Item = &FunctionCall> {
        self.parts.iter().filter_map(Part::as_function_call)
    }
}

/// Check that every tool-result entry directly follows a model entry that
/// requested a function of the same name.
pub fn tool_results_are_paired(history: &[Content]) -> bool {
    history.iter().enumerate().all(|(i, entry)| {
        if entry.role != Role::Tool {
            return true;
        }
        let Some(prev) = i.checked_sub(1).map(|p| &history[p]) else {
            return false;
        };
        if prev.role != Role::Model {
            return false;
        }
        entry
            .parts
            .iter()
            .filter_map(Part::as_function_response)
            .all(|resp| prev.function_calls().any(|call| call.name == resp.name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_constructors() {
        let user = Content::user("Hello");
        assert_eq!(user.role, Role::User);
        assert_eq!(user.text(), Some("Hello".to_string()));

        let call = Content::model_call(FunctionCall::new("list_dir", json!({"path": "/tmp"})));
        assert_eq!(call.role, Role::Model);
        assert!(call.text().is_none());
        assert_eq!(call.first_function_call().map(|c| c.name.as_str()), Some("list_dir"));
    }

    #[test]
    fn test_first_function_call_skips_text() {
        let entry = Content::new(
            Role::Model,
            vec![
                Part::text("let me check"),
                Part::FunctionCall(FunctionCall::new("a", json!({}))),
                Part::FunctionCall(FunctionCall::new("b", json!({}))),
            ],
        );
        assert_eq!(entry.first_function_call().unwrap().name, "a");
        assert_eq!(entry.function_calls().count(), 2);
        assert_eq!(entry.text(), Some("let me check".to_string()));
    }

    #[test]
    fn test_function_response_shapes() {
        let call = FunctionCall::new("list_dir", json!({})).with_id("call_1");
        let ok = FunctionResponse::success(&call, "a.txt");
        assert!(!ok.is_error());
        assert_eq!(ok.content(), Some("a.txt"));
        assert_eq!(ok.id.as_deref(), Some("call_1"));

        let err = FunctionResponse::error(&call, "nope");
        assert!(err.is_error());
        assert_eq!(err.error_message(), Some("nope"));
    }

    #[test]
    fn test_part_serialization_is_tagged() {
        let part = Part::FunctionCall(FunctionCall::new("list_dir", json!({"path": "/tmp"})));
        let json = serde_json::to_value(&part).unwrap();
        assert_eq!(json["kind"], "function_call");
        assert_eq!(json["name"], "list_dir");
        assert!(json.get("id").is_none());

        let text = serde_json::to_value(Part::text("hi")).unwrap();
        assert_eq!(text, json!({"kind": "text", "text": "hi"}));
    }

    #[test]
    fn test_content_deserializes_from_record() {
        let record = json!({
            "role": "tool",
            "parts": [{"kind": "function_response", "name": "x", "response": {"error": "e"}}]
        });
        let content: Content = serde_json::from_value(record).unwrap();
        assert_eq!(content.role, Role::Tool);
        assert!(content.parts[0].as_function_response().unwrap().is_error());
    }

    #[test]
    fn test_tool_results_are_paired() {
        let call = FunctionCall::new("list_dir", json!({}));
        let good = vec![
            Content::user("hi"),
            Content::model_call(call.clone()),
            Content::tool_response(FunctionResponse::success(&call, "ok")),
        ];
        assert!(tool_results_are_paired(&good));

        let orphan = vec![
            Content::user("hi"),
            Content::tool_response(FunctionResponse::success(&call, "ok")),
        ];
        assert!(!tool_results_are_paired(&orphan));

        let other = FunctionCall::new("other", json!({}));
        let mismatched = vec![
            Content::model_call(other),
            Content::tool_response(FunctionResponse::success(&call, "ok")),
        ];
        assert!(!tool_results_are_paired(&mismatched));
    }
}
