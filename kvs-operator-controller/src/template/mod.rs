// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

//! Templates for composing secret values.
//!
//! Text outside `[[ ]]` is copied verbatim. An action is either a string literal or a call
//! to `secretValue "name"` / `secretValueForVersion "name" "version"`. A failed vault lookup
//! renders as the lookup's error message, while malformed templates and unknown functions
//! fail the whole render.

pub mod functions;
pub mod parser;

use std::result;
use thiserror::Error;

use crate::secretstore::SecretStore;

pub use functions::{BoundTemplate, Function, FunctionTable};
pub use parser::{parse, Action, Node, Template};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum TemplateError {
    #[error("unclosed action starting at offset {0}")]
    UnclosedAction(usize),
    #[error("unterminated string starting at offset {0}")]
    UnterminatedString(usize),
    #[error("unknown escape sequence \\{ch} at offset {offset}")]
    InvalidEscape { ch: char, offset: usize },
    #[error("unexpected {ch:?} at offset {offset}")]
    UnexpectedCharacter { ch: char, offset: usize },
    #[error("empty action at offset {0}")]
    EmptyAction(usize),
    #[error("can't give argument to non-function at offset {0}")]
    ArgumentsToNonFunction(usize),
    #[error("function arguments must be string literals (offset {0})")]
    NonLiteralArgument(usize),
    #[error("function {0:?} not defined")]
    UnknownFunction(String),
    #[error("wrong number of args for {name}: want {expected} got {got}")]
    WrongArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },
}

pub type TemplateResult<T> = result::Result<T, TemplateError>;

/// Parse, bind and execute a template against a secret store
pub async fn render(source: &str, store: &dyn SecretStore) -> TemplateResult<String> {
    let template = parse(source)?.bind(&FunctionTable::secret_functions())?;
    Ok(template.execute(store).await)
}
