// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types reported by the engine.
//!
//! Every failure surfaced to an embedder is an [`Error`]. Lexing and parsing
//! always know their source line; runtime errors carry one whenever the
//! failing node could be attributed to a statement.

use thiserror::Error;

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while loading or running a script.
#[derive(Debug, Error)]
pub enum Error {
    /// Unrecognized or malformed input in the source text.
    #[error("LexError: {message} (line {line})")]
    Lex {
        /// What went wrong
        message: String,
        /// 1-based source line
        line: usize,
    },

    /// A token appeared where the grammar does not allow it.
    #[error("ParseError: {message} (line {line})")]
    Parse {
        /// What went wrong
        message: String,
        /// 1-based source line
        line: usize,
    },

    /// An invalid operation at run time.
    #[error("RuntimeError: {message}{}", at_line(.line))]
    Runtime {
        /// What went wrong
        message: String,
        /// 1-based source line, when known
        line: Option<usize>,
    },

    /// A script-level `throw` that nothing caught.
    #[error("Uncaught {value}{}", at_line(.line))]
    Thrown {
        /// Display form of the thrown value
        value: String,
        /// 1-based source line, when known
        line: Option<usize>,
    },

    /// The cooperative step or time budget ran out. Scripts cannot catch this.
    #[error("RuntimeError: {message}{}", at_line(.line))]
    Interrupted {
        /// Which budget was exceeded
        message: String,
        /// 1-based source line, when known
        line: Option<usize>,
    },

    /// Reading a script file failed.
    #[error("IOError: {0}")]
    Io(#[from] std::io::Error),
}

fn at_line(line: &Option<usize>) -> String {
    match line {
        Some(line) => format!(" (line {line})"),
        None => String::new(),
    }
}

impl Error {
    /// Creates a lex error.
    pub fn lex(message: impl Into<String>, line: usize) -> Self {
        Error::Lex {
            message: message.into(),
            line,
        }
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>, line: usize) -> Self {
        Error::Parse {
            message: message.into(),
            line,
        }
    }

    /// Creates a runtime error without a line; the interpreter attaches one
    /// as the error propagates through a statement.
    pub fn runtime(message: impl Into<String>) -> Self {
        Error::Runtime {
            message: message.into(),
            line: None,
        }
    }

    /// Creates a type-style runtime error, e.g. calling a non-function.
    pub fn type_error(message: impl Into<String>) -> Self {
        Self::runtime(format!("TypeError: {}", message.into()))
    }

    /// Creates a reference-style runtime error for an unbound name.
    pub fn reference_error(name: &str) -> Self {
        Self::runtime(format!("ReferenceError: {name} is not defined"))
    }

    /// Creates the error raised when the step or time budget runs out.
    pub fn interrupted() -> Self {
        Error::Interrupted {
            message: "execution budget exceeded".to_string(),
            line: None,
        }
    }

    /// The message without the kind prefix or line suffix.
    pub fn message(&self) -> String {
        match self {
            Error::Lex { message, .. }
            | Error::Parse { message, .. }
            | Error::Runtime { message, .. }
            | Error::Interrupted { message, .. } => message.clone(),
            Error::Thrown { value, .. } => value.clone(),
            Error::Io(err) => err.to_string(),
        }
    }

    /// The 1-based source line, if one is known.
    pub fn line(&self) -> Option<usize> {
        match self {
            Error::Lex { line, .. } | Error::Parse { line, .. } => Some(*line),
            Error::Runtime { line, .. }
            | Error::Thrown { line, .. }
            | Error::Interrupted { line, .. } => *line,
            Error::Io(_) => None,
        }
    }

    /// Attaches `line` unless the error already has one.
    pub fn with_line(mut self, at: usize) -> Self {
        match &mut self {
            Error::Runtime { line, .. }
            | Error::Thrown { line, .. }
            | Error::Interrupted { line, .. } => {
                line.get_or_insert(at);
            }
            _ => {}
        }
        self
    }

    /// Whether script code may intercept this error with `try`/`catch`.
    pub fn is_catchable(&self) -> bool {
        matches!(self, Error::Runtime { .. } | Error::Thrown { .. })
    }
}
