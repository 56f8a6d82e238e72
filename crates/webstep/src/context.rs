//! Per-scenario state.

use serde_json::Value;
use std::path::PathBuf;

use crate::content::{ContentHolder, ContentRepository};
use crate::result::StepResult;

/// State owned by one running scenario
#[derive(Debug, Clone, Default)]
pub struct ScenarioContext {
    /// Data stored by earlier steps
    pub content: ContentHolder,
    /// Phrase of the last search, checked by result steps
    pub prior_search_phrase: String,
}

impl ScenarioContext {
    /// Fresh context for a new scenario
    #[must_use]
    pub fn fresh() -> Self {
        Self::default()
    }

    /// Drop everything left by a previous scenario
    pub fn reset(&mut self) {
        tracing::debug!(held = self.content.len(), "resetting scenario context");
        self.content.clear();
        self.prior_search_phrase.clear();
    }

    /// Held data for `identifier`, falling back to the repository
    pub fn content_by_identifier<R: ContentRepository + ?Sized>(
        &self,
        identifier: &str,
        repository: &R,
    ) -> StepResult<Option<Value>> {
        match self.content.get(identifier) {
            Some(held) => Ok(Some(held.clone())),
            None => repository.data_by_identifier(identifier),
        }
    }

    /// `identifier` itself when it names an existing file, else the path held
    /// (or known to the repository) under that identifier
    pub fn file_by_identifier<R: ContentRepository + ?Sized>(
        &self,
        identifier: &str,
        repository: &R,
    ) -> StepResult<Option<PathBuf>> {
        let direct = PathBuf::from(identifier);
        if direct.is_file() {
            return Ok(Some(direct));
        }
        Ok(self
            .content_by_identifier(identifier, repository)?
            .and_then(|value| value.as_str().map(PathBuf::from)))
    }
}
