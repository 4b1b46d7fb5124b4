// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

pub const ENV_PREFIX: &str = "KVS_OPERATOR";
pub const KEYVAULT_ENV_PREFIX: &str = "KEYVAULT_";
pub const DEFAULT_CREDENTIALS_FILE: &str = "/etc/kubernetes/azure.json";
pub const DEFAULT_REPORTER: &str = "secret-controller";
