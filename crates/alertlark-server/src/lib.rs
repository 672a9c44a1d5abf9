//! # alertlark-server
//!
//! HTTP front end of the Alertmanager to Lark bridge.
//!
//! Alertmanager posts Slack-style webhooks to `/notify`; each alert becomes an
//! interactive Lark card, and resolutions are threaded under the card that
//! announced the alert. Card actions arrive on `/callback` and are turned
//! into Alertmanager silences.
//!
//! ## Example
//!
//! ```rust,no_run
//! use alertlark_server::{ProductionServer, ServerConfig};
//!
//! # async fn example() -> alertlark_server::ServerResult<()> {
//! let config = ServerConfig::default()
//!     .with_lark_credentials("cli_xxx", "secret")
//!     .with_verification_token("token");
//! let server = ProductionServer::connect(&config).await?;
//! server.serve(config.bind_addr).await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## API Endpoints
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/ping` | GET | Liveness probe |
//! | `/notify` | POST | Alertmanager webhook receiver |
//! | `/callback` | POST | Lark card actions and URL verification |

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod server;
pub mod state;

// Re-export main types
pub use config::{Cli, ServerConfig};
pub use error::{ServerError, ServerResult};
pub use routes::create_router;
pub use server::{AlertlarkServer, ProductionServer};
pub use state::AppState;
