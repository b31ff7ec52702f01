//! Scripted [`ReadingSource`] for tests.

use std::collections::VecDeque;

use async_trait::async_trait;

use crate::monitor::Reading;
use crate::source::{ReadingSource, SourceError};

/// Replays a fixed script, then reports [`SourceError::Closed`].
#[derive(Default)]
pub struct ScriptedSource {
    script: VecDeque<Result<Reading, SourceError>>,
}

impl ScriptedSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_reading(mut self, reading: Reading) -> Self {
        self.script.push_back(Ok(reading));
        self
    }

    pub fn with_error(mut self, err: SourceError) -> Self {
        self.script.push_back(Err(err));
        self
    }
}

#[async_trait]
impl ReadingSource for ScriptedSource {
    async fn read_reading(&mut self) -> Result<Reading, SourceError> {
        self.script.pop_front().unwrap_or(Err(SourceError::Closed))
    }

    fn source_name(&self) -> &str {
        "scripted"
    }
}
