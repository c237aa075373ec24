//! Resource guards for attacker-supplied documents

use serde::{Deserialize, Serialize};

/// Bounds applied while building an in-memory tree.
///
/// A document that exceeds either bound is rejected outright rather than
/// truncated, so a partial tree never reaches the mapping stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeLimits {
    pub max_depth: usize,
    pub max_elements: usize,
}

impl Default for TreeLimits {
    fn default() -> Self {
        Self {
            // serde_json refuses deeper nesting on its own
            max_depth: 128,
            max_elements: 2_000_000,
        }
    }
}
