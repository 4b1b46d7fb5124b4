// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use std::result;
use thiserror::Error;

use crate::secretstore::VaultError;
use crate::template::TemplateError;

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error("kubernetes api error: {0}")]
    KubeError(#[from] kube::Error),
    #[error("missing object key: {0}")]
    MissingObjectKeyError(&'static str),
    #[error("not found: {0}")]
    NotFoundError(String),
    #[error("validation error: {0}")]
    ValidationError(String),
    #[error("vault error: {0}")]
    VaultError(#[from] VaultError),
    #[error("template error: {0}")]
    TemplateError(#[from] TemplateError),
    #[error("unknown error: {0}")]
    UnknownError(String),
}

pub type Result<T> = result::Result<T, ControllerError>;
