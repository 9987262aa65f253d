// Copyright (c) 2026 Ruya HR Platform
// SPDX-License-Identifier: AGPL-3.0
//! API server
//!
//! Builds storage, the critic LLM provider and both services from a loaded
//! manifest, then serves the router until Ctrl+C or SIGTERM.

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{debug, error, info, warn};

use ruya_core::{
    application::{
        critic_service::StandardCriticService,
        learning_service::StandardLearningService,
        repository_factory::{create_repositories, LearningRepositories},
    },
    domain::{repository::StorageBackend, service_config::ServiceConfigManifest},
    infrastructure::{
        db::Database,
        evaluation_store::FileEvaluationRepository,
        event_bus::{EventBus, EventBusError, EventReceiver},
        llm::create_provider,
    },
    presentation::api::{app, AppState},
};

/// Address the API listens on. CLI flags win over the manifest.
pub fn bind_address(config: &ServiceConfigManifest, host: Option<&str>, port: Option<u16>) -> String {
    format!(
        "{}:{}",
        host.unwrap_or(&config.spec.server.bind_address),
        port.unwrap_or(config.spec.server.port)
    )
}

pub async fn start_server(config: ServiceConfigManifest, host: Option<&str>, port: Option<u16>) -> Result<()> {
    config.validate().context("Configuration validation failed")?;
    info!(name = %config.metadata.name, "Ruya learning service starting");

    if let Some(metrics_port) = config.spec.observability.metrics_port {
        install_metrics_exporter(&config.spec.server.bind_address, metrics_port)?;
    }

    let repos = build_repositories(&config).await?;
    let event_bus = Arc::new(EventBus::with_default_capacity());
    tokio::spawn(log_events(event_bus.subscribe()));

    let learning = StandardLearningService::new(&repos, event_bus.clone(), &config.spec.learning);

    let llm = create_provider(&config.spec.llm, config.llm_api_key())
        .context("Failed to initialize critic LLM provider")?;
    info!(
        provider = ?config.spec.llm.provider,
        model = %config.spec.llm.model,
        endpoint = %config.spec.llm.endpoint,
        "Critic LLM provider configured"
    );

    let evaluations = Arc::new(FileEvaluationRepository::new(&config.spec.critic.evaluations_dir));
    info!(dir = %evaluations.dir().display(), "Critic evaluations directory");

    let critic = StandardCriticService::new(
        llm,
        evaluations,
        repos.feedback.clone(),
        learning.aggregator(),
        learning.evolver(),
        event_bus,
    )
    .with_default_sample_limit(config.spec.critic.default_sample_limit);

    let router = app(
        AppState {
            learning: Arc::new(learning),
            critic: Arc::new(critic),
        },
        &config.spec.server.allowed_origins,
    );

    let addr = bind_address(&config, host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Server shut down");
    Ok(())
}

async fn build_repositories(config: &ServiceConfigManifest) -> Result<LearningRepositories> {
    let backend = config.storage_backend()?;
    match &backend {
        StorageBackend::InMemory => {
            warn!("Using in-memory storage; learning data is lost on restart");
            create_repositories(&backend, None)
        }
        StorageBackend::PostgreSQL(pg) => {
            let db = Database::from_config(pg).await?;
            info!(max_connections = pg.max_connections, "Connected to PostgreSQL");
            create_repositories(&backend, Some(db.get_pool().clone()))
        }
    }
}

fn install_metrics_exporter(host: &str, port: u16) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", host, port)
        .parse()
        .with_context(|| format!("Invalid metrics address {}:{}", host, port))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .context("Failed to install Prometheus exporter")?;

    info!("Prometheus metrics on http://{}/metrics", addr);
    Ok(())
}

async fn log_events(mut events: EventReceiver) {
    loop {
        match events.recv().await {
            Ok(event) => debug!(event_type = event.event_type(), agent_type = %event.agent_type(), "Learning event"),
            Err(EventBusError::Lagged(n)) => warn!("Event log fell behind by {} events", n),
            Err(_) => break,
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        },
        _ = terminate => {
            info!("Received SIGTERM signal");
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_manifest_address() {
        let mut config = ServiceConfigManifest::default();
        config.spec.server.bind_address = "0.0.0.0".to_string();
        config.spec.server.port = 9000;

        assert_eq!(bind_address(&config, None, None), "0.0.0.0:9000");
        assert_eq!(bind_address(&config, Some("127.0.0.1"), None), "127.0.0.1:9000");
        assert_eq!(bind_address(&config, None, Some(8100)), "0.0.0.0:8100");
    }
}
