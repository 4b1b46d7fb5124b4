// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

pub mod utils;
pub mod v1alpha1;

pub use v1alpha1::keyvault_secret::{KeyvaultSecret, KeyvaultSecretSpec, SecretEntry};
