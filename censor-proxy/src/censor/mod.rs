//! Word-level redaction of response bodies

pub mod engine;
pub mod words;

pub use engine::{censor, ResponseCensor, REDACTION_MARKER};
pub use words::WordList;
