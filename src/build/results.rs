use crate::error::{BuildError, Result};
use crate::types::BuildResult;

/// Results of the most recent build pass, in the order units ran.
#[derive(Debug, Clone, Default)]
pub struct ResultAggregator {
    results: Vec<BuildResult>,
}

impl ResultAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, result: BuildResult) {
        self.results.push(result);
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    /// Copy of every recorded result, or a state error when nothing was built.
    pub fn snapshot(&self) -> Result<Vec<BuildResult>> {
        if self.results.is_empty() {
            return Err(BuildError::NothingBuilt);
        }

        Ok(self.results.clone())
    }
}
