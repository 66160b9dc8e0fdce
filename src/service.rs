use std::{net::SocketAddr, sync::Arc};

use anyhow::{Context, Result};
use axum_server::Handle;
use storage_client::{HttpStorageClient, ObjectStoreClient};
use tokio::{self, signal};
use tracing::info;

use crate::{
    boot::BootReconciler,
    config::ServerConfig,
    provision::BucketProvisioner,
    routes::{create_routes, RouteState},
};

#[derive(Clone)]
#[allow(dead_code)]
pub struct Service {
    pub config: ServerConfig,
    pub storage: Arc<dyn ObjectStoreClient>,
    pub provisioner: Arc<BucketProvisioner>,
    pub boot: Arc<BootReconciler>,
}

impl Service {
    pub fn new(config: ServerConfig) -> Result<Self> {
        config.require_credentials()?;
        let storage: Arc<dyn ObjectStoreClient> = Arc::new(
            HttpStorageClient::new(&config.storage).context("error initializing storage client")?,
        );
        Ok(Self::with_storage(config, storage))
    }

    /// Composition root over an already-built store client; used directly
    /// by tests so every test case owns a fresh boot guard.
    pub fn with_storage(config: ServerConfig, storage: Arc<dyn ObjectStoreClient>) -> Self {
        let provisioner = Arc::new(BucketProvisioner::new(storage.clone()));
        let boot = Arc::new(BootReconciler::new(provisioner.clone()));
        Self {
            config,
            storage,
            provisioner,
            boot,
        }
    }

    pub async fn start(&self) -> Result<()> {
        // Fire-and-forget: readiness never waits on the store.
        self.boot.trigger();

        let route_state = RouteState {
            provisioner: self.provisioner.clone(),
        };

        let handle = Handle::new();
        let handle_sh = handle.clone();
        tokio::spawn(async move {
            shutdown_signal(handle_sh).await;
            info!("graceful shutdown signal received, shutting down server gracefully");
        });

        let addr: SocketAddr = self.config.listen_addr.parse()?;
        info!("server api listening on {}", self.config.listen_addr);
        let routes = create_routes(route_state);
        axum_server::bind(addr)
            .handle(handle)
            .serve(routes.into_make_service())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal(handle: Handle) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
        },
        _ = terminate => {
        },
    }
    handle.shutdown();
    info!("signal received, shutting down server gracefully");
}
