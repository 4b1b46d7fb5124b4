// SPDX-FileCopyrightText: 2025 Timothy Pogue
//
// SPDX-License-Identifier: ISC

mod cli;

use std::process;
use std::sync::Arc;
use clap::Parser;
use rustls::crypto::aws_lc_rs;
use tokio::signal;
use tokio_util::sync::CancellationToken;

use kvs_operator_common::config::{AppConfig, AppConfigBuilder};
use kvs_operator_common::telemetry::{error, info, setup_logging};
use kvs_operator_controller::controller::{start, utils::create_k8s_client};
use kvs_operator_controller::secretstore::KeyVaultClient;

use crate::cli::CliArgs;

/// Layer defaults, the config file, environment and flags
fn load_config(args: &CliArgs) -> anyhow::Result<AppConfig> {
    let mut builder = AppConfigBuilder::default();

    if let Some(path) = args.config.as_deref() {
        builder.with_file(path);
    }

    let config = builder
        .with_env()
        .with_keyvault_env()
        .with_override_option("vault.name", args.vault_name.as_deref())
        .with_override_option("controller.namespace", args.namespace.as_deref())
        .with_override_number("controller.workers", args.workers)
        .build()?;

    Ok(config)
}

/// Cancel `token` on SIGINT or SIGTERM
async fn shutdown_signal(token: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(event = "SignalHandlerFailed", signal = "SIGINT", error = %e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(event = "SignalHandlerFailed", signal = "SIGTERM", error = %e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => (),
        _ = terminate => (),
    }

    info!(event = "ShuttingDown");
    token.cancel();
}

#[tokio::main]
async fn main() {
    // Install the default aws_lc_rs crypto provider
    let _ = aws_lc_rs::default_provider().install_default();

    let args = CliArgs::parse();

    setup_logging();

    info!(
        event = "Starting",
        version = env!("CARGO_PKG_VERSION"),
    );

    // Load configuration
    let config = load_config(&args).unwrap_or_else(|e| {
        error!(
            event = "Error",
            error = %e,
        );
        process::exit(1);
    });

    // Create necessary resources
    let client = create_k8s_client(args.kubeconfig.as_deref()).await.unwrap_or_else(|e| {
        error!(
            event = "Error",
            error = %e,
        );
        process::exit(1);
    });
    let store = KeyVaultClient::new(&config.vault).unwrap_or_else(|e| {
        error!(
            event = "Error",
            error = %e,
        );
        process::exit(1);
    });
    info!(
        event = "VaultConfigured",
        vault = store.vault_url(),
    );

    let shutdown = CancellationToken::new();
    tokio::spawn(shutdown_signal(shutdown.clone()));

    // Run the controller until a shutdown signal arrives
    if let Err(e) = start(client, &config.controller, Arc::new(store), shutdown).await {
        error!(
            event = "Error",
            error = %e,
        );
        process::exit(1);
    }

    info!(event = "Stopped");
}
