//! Model backends
//!
//! The orchestrator talks to a model through the `ModelBackend` trait.
//! `GenaiBackend` reaches real APIs via the `genai` crate (Gemini by default,
//! any genai-routable model otherwise). `MockBackend` replays a script and is
//! used throughout the tests.

mod traits;
mod error;
mod response;
mod genai_adapter;
mod genai_backend;
mod mock;

pub use traits::{approximate_tokens, GenerateOptions, ModelBackend};
pub use error::{BackendError, BackendResult};
pub use response::{Candidate, FinishReason, ModelResponse};

pub use genai_backend::GenaiBackend;

pub use mock::{withheld_response, MockBackend, MockMode, RecordedRequest};

use crate::logging::Logger;
use std::sync::Arc;

/// Create a backend by name; anything other than `mock` goes through genai
pub fn create_backend(
    name: &str,
    api_key: Option<String>,
    logger: Arc<dyn Logger>,
) -> Arc<dyn ModelBackend> {
    match name.to_lowercase().as_str() {
        "mock" => Arc::new(MockBackend::new(logger)),
        _ => {
            let backend = GenaiBackend::new(logger);
            match api_key {
                Some(key) => Arc::new(backend.with_api_key(key)),
                None => Arc::new(backend),
            }
        }
    }
}
