//! Server setup and lifecycle management

use crate::api::create_router;
use crate::api::rest::state::AppState;
use crate::config::{DaemonConfig, StorageConfig};
use crate::error::{DaemonError, DaemonResult};
use editorial_coordinator::{WorkflowCoordinator, WorkflowEvent};
use editorial_roles::RoleResolver;
use editorial_storage::memory::InMemoryEditorialStore;
use editorial_storage::EditorialStore;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;

/// Editorial daemon server
pub struct Server {
    config: DaemonConfig,
    coordinator: Arc<WorkflowCoordinator>,
    resolver: Arc<RoleResolver>,
}

impl Server {
    /// Open storage and build the coordinator for `config`
    pub async fn new(config: DaemonConfig) -> DaemonResult<Self> {
        let store = open_store(&config.storage).await?;
        let coordinator = WorkflowCoordinator::new(store, config.locks.clone())?;
        let resolver = RoleResolver::new(config.roles.clone());

        Ok(Self {
            config,
            coordinator: Arc::new(coordinator),
            resolver: Arc::new(resolver),
        })
    }

    /// Run the server until a shutdown signal arrives
    pub async fn run(self) -> DaemonResult<()> {
        let addr = self.config.server.listen_addr;

        let state = AppState::new(self.coordinator.clone(), self.resolver.clone());
        let app = create_router(state, self.config.server.enable_cors);

        let listener = TcpListener::bind(addr).await?;

        tracing::info!("editoriald listening on {}", addr);
        tracing::info!(
            lease_secs = self.config.locks.lease_duration_secs,
            heartbeat_secs = self.config.locks.heartbeat_interval_secs,
            "edit lock timing"
        );

        let events = tokio::spawn(log_events(self.coordinator.subscribe()));

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| DaemonError::Server(e.to_string()))?;

        tracing::info!("editoriald shutting down");
        events.abort();

        Ok(())
    }
}

async fn open_store(config: &StorageConfig) -> DaemonResult<Arc<dyn EditorialStore>> {
    match config {
        StorageConfig::Memory => {
            tracing::warn!("using in-memory storage; state is lost on restart");
            Ok(Arc::new(InMemoryEditorialStore::new()))
        }
        #[cfg(feature = "postgres")]
        StorageConfig::Postgres {
            url,
            max_connections,
            connect_timeout_secs,
        } => {
            use editorial_storage::postgres::PostgresEditorialStore;

            let store = PostgresEditorialStore::connect_with_options(
                url,
                *max_connections,
                *connect_timeout_secs,
            )
            .await
            .map_err(|e| DaemonError::Storage(e.to_string()))?;
            tracing::info!(max_connections, "connected to PostgreSQL");
            Ok(Arc::new(store))
        }
        #[cfg(not(feature = "postgres"))]
        StorageConfig::Postgres { .. } => Err(DaemonError::Config(
            "PostgreSQL storage requires building with the `postgres` feature".to_string(),
        )),
    }
}

/// Mirror workflow events into the log
async fn log_events(mut events: broadcast::Receiver<WorkflowEvent>) {
    loop {
        match events.recv().await {
            Ok(event) => tracing::debug!(article_id = %event.article_id(), ?event, "workflow event"),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagging");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_server_builds() {
        let server = Server::new(DaemonConfig::default()).await.unwrap();
        assert_eq!(server.coordinator.lock_config().lease_duration_secs, 120);
    }

    #[cfg(not(feature = "postgres"))]
    #[tokio::test]
    async fn test_postgres_without_feature_is_config_error() {
        let config = StorageConfig::Postgres {
            url: "postgres://localhost/editorial".to_string(),
            max_connections: 1,
            connect_timeout_secs: 1,
        };
        let err = open_store(&config).await.err().unwrap();
        assert!(matches!(err, DaemonError::Config(_)));
    }
}
