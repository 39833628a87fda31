//! Diagnostics for every pass of the compiler.
//!
//! Nothing in the library terminates the process: parse, wrap-up, doc conversion and
//! validation failures are returned as [`CompileError`] and the driver decides what to do.
//! Every variant that originates in the source text carries a [`Position`] and renders as
//! `file:line: message`.

use crate::parameter::Direction;
use std::fmt;

/// Source location of a declaration (`file:line`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Position {
    pub file: String,
    pub line: usize,
}

impl Position {
    pub fn new(file: impl Into<String>, line: usize) -> Self {
        Position {
            file: file.into(),
            line,
        }
    }

    /// Position of objects synthesized by the compiler rather than declared in source.
    pub fn synthesized() -> Self {
        Position {
            file: "<synthesized>".to_string(),
            line: 0,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("{file}: parse error: {message}")]
    Parse { file: String, message: String },
    #[error("{pos}: undefined {what} '{name}'")]
    UndefinedReference {
        pos: Position,
        what: &'static str,
        name: String,
    },
    #[error("{pos}: duplicate {what} '{name}'")]
    Duplicate {
        pos: Position,
        what: &'static str,
        name: String,
    },
    #[error("{pos}: unknown type '{type_name}' for parameter '{name}'")]
    UnknownType {
        pos: Position,
        type_name: String,
        name: String,
    },
    #[error("{pos}: category '{category}' has {what} but no {spec} spec")]
    MissingSpec {
        pos: Position,
        category: String,
        what: &'static str,
        spec: &'static str,
    },
    #[error("{pos}: virtual parameter '{name}' has no concrete descendant")]
    VirtualWithoutConcrete { pos: Position, name: String },
    #[error("{pos}: direction '{direction}' not allowed in {context}")]
    Direction {
        pos: Position,
        direction: Direction,
        context: String,
    },
    #[error("{pos}: unsupported documentation tag '@{label}'")]
    UnsupportedDocTag { pos: Position, label: String },
    #[error("{pos}: '@param {name}' is not a parameter of '{owner}'")]
    UnknownDocParameter {
        pos: Position,
        owner: String,
        name: String,
    },
    #[error("{pos}: unknown option '{key}'")]
    InvalidOption { pos: Position, key: String },
    #[error("{pos}: invalid value '{value}' for '{property}' of '{name}'")]
    InvalidProperty {
        pos: Position,
        name: String,
        property: String,
        value: String,
    },
    #[error("{pos}: {message}")]
    Invalid { pos: Position, message: String },
    #[error("{path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("IO: {0}")]
    Write(#[from] std::io::Error),
}

impl CompileError {
    /// Position in the source that triggered the error, if any.
    pub fn position(&self) -> Option<&Position> {
        match self {
            CompileError::UndefinedReference { pos, .. }
            | CompileError::Duplicate { pos, .. }
            | CompileError::UnknownType { pos, .. }
            | CompileError::MissingSpec { pos, .. }
            | CompileError::VirtualWithoutConcrete { pos, .. }
            | CompileError::Direction { pos, .. }
            | CompileError::UnsupportedDocTag { pos, .. }
            | CompileError::UnknownDocParameter { pos, .. }
            | CompileError::InvalidOption { pos, .. }
            | CompileError::InvalidProperty { pos, .. }
            | CompileError::Invalid { pos, .. } => Some(pos),
            CompileError::Parse { .. } | CompileError::Io { .. } | CompileError::Write(_) => None,
        }
    }
}

pub type CompileResult<T> = Result<T, CompileError>;
