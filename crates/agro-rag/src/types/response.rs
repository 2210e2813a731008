//! Ask response types

use serde::{Deserialize, Serialize};

/// JSON body returned by `POST /ask`, for answers and errors alike
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub response: String,
}

impl AskResponse {
    pub fn new(response: impl Into<String>) -> Self {
        Self {
            response: response.into(),
        }
    }
}
