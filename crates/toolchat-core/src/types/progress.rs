//! Optional observer for human-readable turn progress

use std::sync::Arc;

/// Callback receiving step descriptions
pub type ProgressCallback = Arc<dyn Fn(&str) + Send + Sync>;

/// Progress channel that may be absent; reporting never affects control flow
#[derive(Clone, Default)]
pub struct Progress {
    callback: Option<ProgressCallback>,
}

impl Progress {
    pub fn new(callback: ProgressCallback) -> Self {
        Self {
            callback: Some(callback),
        }
    }

    pub fn none() -> Self {
        Self::default()
    }

    pub fn step(&self, message: &str) {
        if let Some(callback) = &self.callback {
            callback(message);
        }
    }
}

impl std::fmt::Debug for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("attached", &self.callback.is_some())
            .finish()
    }
}
