//! External service integrations.

pub mod llm_client {
    pub use crate::llm_client::*;
}

pub mod document_analysis {
    pub use crate::document_analysis::*;
}

pub mod settings {
    pub use crate::settings::*;
}
