//! Fleet sync Kubernetes operator
//!
//! Main entry point. Sets up the Kubernetes client, runs the RemoteCluster
//! and RemoteObject controllers and the metrics server.

use clap::Parser;
use kube::Client;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use fleet_sync_operator::{
    config::OperatorConfig,
    controllers::{remote_cluster_controller, remote_object_controller, Context},
    metrics,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = OperatorConfig::parse();
    init_tracing(config.log_json);

    info!(?config, "Starting fleet sync operator");

    let client = Client::try_default().await?;
    info!("Connected to Kubernetes API server");

    let context = Context::new(client.clone(), config.reconcile_timeout());

    let shutdown = CancellationToken::new();
    let metrics_handle = tokio::spawn(metrics::serve(config.metrics_port, shutdown.clone()));
    info!("Metrics server starting on port {}", config.metrics_port);

    let clusters = tokio::spawn(remote_cluster_controller::run(
        client.clone(),
        context.clone(),
        config.concurrency,
    ));
    let objects = tokio::spawn(remote_object_controller::run(
        client,
        context,
        config.concurrency,
    ));

    tokio::select! {
        _ = clusters => {
            error!("RemoteCluster controller exited");
        }
        _ = objects => {
            error!("RemoteObject controller exited");
        }
        res = metrics_handle => {
            match res {
                Ok(Err(e)) => error!("Metrics server failed: {:?}", e),
                _ => error!("Metrics server exited unexpectedly"),
            }
        }
        _ = shutdown_signal() => {
            info!("Received shutdown signal, stopping operator");
        }
    }

    shutdown.cancel();
    info!("Fleet sync operator stopped");
    Ok(())
}

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,fleet_sync_operator=debug,kube=warn,hyper=warn")
    });

    let registry = tracing_subscriber::registry().with(env_filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Wait for SIGTERM or SIGINT
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for CTRL+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received CTRL+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }
}
