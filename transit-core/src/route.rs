//! Fixed jeepney routes
//!
//! A route is an ordered list of checkpoint names. The order defines
//! adjacency along the route and never changes once the route exists;
//! new checkpoints can only be appended at the end.

use serde::Serialize;

use crate::{Error, Result};

/// An ordered sequence of named checkpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Route {
    name: String,
    checkpoints: Vec<String>,
}

impl Route {
    /// Create a route from checkpoint names in travel order
    ///
    /// Names are trimmed. Blank names and names that appear twice are
    /// rejected.
    pub fn new<I, S>(name: impl Into<String>, checkpoints: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::InvalidRoute("route name is blank".into()));
        }

        let mut route = Self {
            name,
            checkpoints: Vec::new(),
        };
        for checkpoint in checkpoints {
            route.push_checkpoint(checkpoint)?;
        }
        Ok(route)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Checkpoint names in travel order
    pub fn checkpoints(&self) -> &[String] {
        &self.checkpoints
    }

    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Zero-based position of a checkpoint along the route
    pub fn position(&self, checkpoint: &str) -> Option<usize> {
        self.checkpoints.iter().position(|c| c == checkpoint)
    }

    pub fn contains(&self, checkpoint: &str) -> bool {
        self.position(checkpoint).is_some()
    }

    /// Append a checkpoint at the end of the route, returning its position
    pub fn push_checkpoint(&mut self, checkpoint: impl Into<String>) -> Result<usize> {
        let checkpoint = checkpoint.into().trim().to_string();
        if checkpoint.is_empty() {
            return Err(Error::InvalidRoute(format!(
                "blank checkpoint name on route {}",
                self.name
            )));
        }
        if self.contains(&checkpoint) {
            return Err(Error::InvalidRoute(format!(
                "checkpoint {} appears twice on route {}",
                checkpoint, self.name
            )));
        }
        self.checkpoints.push(checkpoint);
        Ok(self.checkpoints.len() - 1)
    }
}
