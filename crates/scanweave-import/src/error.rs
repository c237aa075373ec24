//! Normalization errors
//!
//! Every variant is fatal for the whole document: once a grammar fails to
//! parse there is no reliable record boundary to resume from.

use scanweave_core::definition::Grammar;

#[derive(Debug, thiserror::Error)]
pub enum NormalizeError {
    #[error("Malformed {grammar} document: {message}")]
    Malformed { grammar: Grammar, message: String },

    #[error("Document nesting exceeds the limit of {limit} levels")]
    DepthExceeded { limit: usize },

    #[error("Document exceeds the limit of {limit} elements")]
    ElementLimitExceeded { limit: usize },

    #[error("Invalid delimited options: {0}")]
    InvalidOptions(String),
}

impl NormalizeError {
    pub(crate) fn malformed(grammar: Grammar, message: impl ToString) -> Self {
        NormalizeError::Malformed {
            grammar,
            message: message.to_string(),
        }
    }
}
