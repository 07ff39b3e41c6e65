//! Tool catalog and tool result types

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::logging::Logger;
use crate::schema::normalize_logged;

/// A tool as advertised by a tool server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Tool name, unique within one server
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Raw JSON Schema for the tool's arguments
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            input_schema: Value::Null,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }
}

/// Why a descriptor could not become a function declaration
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeclarationError {
    #[error("tool name is empty")]
    EmptyName,

    #[error("tool name '{0}' is longer than 64 characters")]
    NameTooLong(String),

    #[error("tool name '{0}' contains characters not allowed in function names")]
    InvalidName(String),
}

/// Upper bound on function names accepted by function-calling APIs
pub const MAX_FUNCTION_NAME_LEN: usize = 64;

/// Tool metadata in the shape the model's function-calling interface accepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDeclaration {
    pub name: String,
    pub description: String,
    /// Normalized parameter schema; `None` means the function takes no parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

impl FunctionDeclaration {
    /// Normalize a descriptor's schema and validate its name
    pub fn from_descriptor(
        tool: &ToolDescriptor,
        logger: &dyn Logger,
    ) -> Result<Self, DeclarationError> {
        validate_function_name(&tool.name)?;
        Ok(Self {
            name: tool.name.clone(),
            description: tool.description.clone(),
            parameters: normalize_logged(&tool.input_schema, logger),
        })
    }
}

fn validate_function_name(name: &str) -> Result<(), DeclarationError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(DeclarationError::EmptyName);
    };
    if name.chars().count() > MAX_FUNCTION_NAME_LEN {
        return Err(DeclarationError::NameTooLong(name.to_string()));
    }
    let valid_first = first.is_ascii_alphabetic() || first == '_';
    let valid_rest = chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'));
    if valid_first && valid_rest {
        Ok(())
    } else {
        Err(DeclarationError::InvalidName(name.to_string()))
    }
}

/// Payload of a successful tool call, classified once at the adapter boundary
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutput {
    /// First content element carried a text field
    Text(String),
    /// First content element had no text (image, resource, ...)
    Structured(Value),
    /// Result had no usable content list at all
    Raw(Value),
}

impl ToolOutput {
    /// Classify a serialized tool-call result (`{"content": [...], ...}`)
    pub fn from_call_result(result: Value) -> Self {
        let first = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|items| items.first())
            .cloned();

        match first {
            Some(element) => match element.get("text").and_then(Value::as_str) {
                Some(text) => ToolOutput::Text(text.to_string()),
                None => ToolOutput::Structured(element),
            },
            None => ToolOutput::Raw(result),
        }
    }

    /// Text handed back to the model
    pub fn into_text(self) -> String {
        match self {
            ToolOutput::Text(text) => text,
            ToolOutput::Structured(value) | ToolOutput::Raw(value) => value.to_string(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ToolOutput::Text(_) => "text",
            ToolOutput::Structured(_) => "structured",
            ToolOutput::Raw(_) => "raw",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::NoOpLogger;
    use serde_json::json;

    #[test]
    fn test_declaration_from_descriptor() {
        let tool = ToolDescriptor::new("read_file", "Read a file").with_schema(json!({
            "type": "object",
            "$schema": "http://json-schema.org/draft-07/schema#",
            "properties": { "path": { "type": "string", "title": "Path" } },
            "required": ["path"],
            "additionalProperties": false
        }));

        let decl = FunctionDeclaration::from_descriptor(&tool, &NoOpLogger).unwrap();
        assert_eq!(decl.name, "read_file");
        assert_eq!(
            decl.parameters,
            Some(json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }))
        );
    }

    #[test]
    fn test_declaration_without_parameters() {
        let tool = ToolDescriptor::new("ping", "Ping").with_schema(json!({"title": "Empty"}));
        let decl = FunctionDeclaration::from_descriptor(&tool, &NoOpLogger).unwrap();
        assert!(decl.parameters.is_none());

        let json = serde_json::to_value(&decl).unwrap();
        assert!(json.get("parameters").is_none());
    }

    #[test]
    fn test_declaration_rejects_bad_names() {
        let empty = ToolDescriptor::new("", "nameless");
        assert_eq!(FunctionDeclaration::from_descriptor(&empty, &NoOpLogger), Err(DeclarationError::EmptyName));

        let spaced = ToolDescriptor::new("read file", "");
        assert!(matches!(
            FunctionDeclaration::from_descriptor(&spaced, &NoOpLogger),
            Err(DeclarationError::InvalidName(_))
        ));

        let long = ToolDescriptor::new("a".repeat(65), "");
        assert!(matches!(
            FunctionDeclaration::from_descriptor(&long, &NoOpLogger),
            Err(DeclarationError::NameTooLong(_))
        ));

        let dotted = ToolDescriptor::new("fs.read-file_v2", "");
        assert!(FunctionDeclaration::from_descriptor(&dotted, &NoOpLogger).is_ok());
    }

    #[test]
    fn test_tool_output_prefers_text() {
        let result = json!({
            "content": [{"type": "text", "text": "a.txt\nb.txt"}, {"type": "text", "text": "ignored"}],
            "isError": false
        });
        assert_eq!(ToolOutput::from_call_result(result), ToolOutput::Text("a.txt\nb.txt".into()));
    }

    #[test]
    fn test_tool_output_stringifies_first_element_without_text() {
        let image = json!({"type": "image", "data": "AAAA", "mimeType": "image/png"});
        let output = ToolOutput::from_call_result(json!({ "content": [image.clone()] }));
        assert_eq!(output, ToolOutput::Structured(image.clone()));
        assert_eq!(output.into_text(), image.to_string());
    }

    #[test]
    fn test_tool_output_falls_back_to_raw() {
        let odd = json!({ "content": [], "structuredContent": {"n": 1} });
        let output = ToolOutput::from_call_result(odd.clone());
        assert_eq!(output.kind(), "raw");
        assert_eq!(output.into_text(), odd.to_string());
    }
}
