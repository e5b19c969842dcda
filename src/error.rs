// ===============================
// src/error.rs
// ===============================
use thiserror::Error;

/// Errors raised by connectors, the tick codec and the desk services.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeskError {
    #[error("parse error: {0}")]
    Parse(String),

    #[error("unknown {kind} key: {key}")]
    UnknownKey { kind: &'static str, key: String },

    #[error("duplicate {kind} key: {key}")]
    DuplicateKey { kind: &'static str, key: String },

    #[error("value out of range: {0}")]
    Range(String),

    #[error("invalid transition for {id}: {from} -> {to}")]
    InvalidTransition { id: String, from: String, to: String },
}

impl DeskError {
    pub fn parse(msg: impl Into<String>) -> Self {
        DeskError::Parse(msg.into())
    }

    pub fn unknown(kind: &'static str, key: impl Into<String>) -> Self {
        DeskError::UnknownKey { kind, key: key.into() }
    }

    pub fn duplicate(kind: &'static str, key: impl Into<String>) -> Self {
        DeskError::DuplicateKey { kind, key: key.into() }
    }
}
