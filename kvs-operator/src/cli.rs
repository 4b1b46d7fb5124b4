// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

use clap::Parser;

#[derive(Parser, Debug)]
#[
    clap(
        name = "keyvault-secret-operator",
        version,
        author,
        about = "Keeps Kubernetes Secrets in sync with Azure Key Vault"
    )
]
pub struct CliArgs {
    #[clap(long, env = "KVS_OPERATOR_CONFIG", help = "Path to a JSON or YAML configuration file")]
    pub config: Option<String>,
    #[clap(long, env = "KEYVAULT_NAME", help = "Name of the Azure Key Vault to read secrets from")]
    pub vault_name: Option<String>,
    #[clap(long, env = "KVS_OPERATOR_WORKERS", help = "Number of concurrent reconcile workers")]
    pub workers: Option<u64>,
    #[clap(long, env = "WATCH_NAMESPACE", help = "Only watch KeyvaultSecrets in this namespace")]
    pub namespace: Option<String>,
    #[clap(long, help = "Path to a kubeconfig, only required when running outside the cluster")]
    pub kubeconfig: Option<String>,
}
