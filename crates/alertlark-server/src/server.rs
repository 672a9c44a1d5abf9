//! Alertlark server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use alertlark_client::LarkClient;
use alertlark_core::{
    AlertSource, AlertmanagerClient, CorrelationStore, Messenger, RedisStore,
};
use tokio::net::TcpListener;
use tracing::info;

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::routes::create_router;
use crate::state::AppState;

/// The server wired to Lark, Redis and Alertmanager.
pub type ProductionServer = AlertlarkServer<LarkClient, RedisStore, AlertmanagerClient>;

/// HTTP server exposing `/ping`, `/notify` and `/callback`.
#[derive(Debug)]
pub struct AlertlarkServer<M, S, A> {
    state: Arc<AppState<M, S, A>>,
}

impl<M, S, A> Clone for AlertlarkServer<M, S, A> {
    fn clone(&self) -> Self {
        Self {
            state: self.state.clone(),
        }
    }
}

impl ProductionServer {
    /// Builds the production collaborators from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a client cannot be built or Redis is unreachable.
    pub async fn connect(config: &ServerConfig) -> ServerResult<Self> {
        let messenger = Arc::new(LarkClient::new(config.lark())?);
        let source = Arc::new(AlertmanagerClient::new(
            &config.alertmanager_host,
            config.request_timeout,
        )?);
        let store = Arc::new(RedisStore::connect(&config.redis()).await?);

        Ok(Self::new(AppState::new(
            messenger,
            store,
            source,
            config.verification_token.clone(),
        )))
    }
}

impl<M, S, A> AlertlarkServer<M, S, A>
where
    M: Messenger + 'static,
    S: CorrelationStore + 'static,
    A: AlertSource + 'static,
{
    /// Create a new server around prepared state.
    #[must_use]
    pub fn new(state: AppState<M, S, A>) -> Self {
        Self {
            state: Arc::new(state),
        }
    }

    /// Get the shared state.
    #[must_use]
    pub fn state(&self) -> Arc<AppState<M, S, A>> {
        self.state.clone()
    }

    /// Create the router without starting the server.
    pub fn router(&self) -> axum::Router {
        create_router(self.state.clone())
    }

    /// Start the server and listen for connections.
    ///
    /// This method runs until the server encounters a fatal error.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve(&self, addr: SocketAddr) -> ServerResult<()> {
        self.serve_with_shutdown(addr, std::future::pending()).await
    }

    /// Start the server with graceful shutdown support.
    ///
    /// The server will shut down when the provided future completes.
    ///
    /// # Errors
    ///
    /// Returns an error if binding to the address fails.
    pub async fn serve_with_shutdown<F>(&self, addr: SocketAddr, shutdown: F) -> ServerResult<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindFailed(addr, e))?;

        info!(addr = %addr, "alertlark listening");

        axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        info!("alertlark shut down");
        Ok(())
    }
}
