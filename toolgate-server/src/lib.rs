//! HTTP front end for the toolgate security gate.
//!
//! Every `POST /tools/{name}` request is authenticated, authorized and
//! audited by a [`SecurityGate`](toolgate_core::SecurityGate) before the
//! tool runs.
//!
//! | Outcome | Status | Body |
//! |---------|--------|------|
//! | Executed | 200 | `{"success": true, "message": …, "data": …}` |
//! | Authentication failed | 401 | `{"error": "authentication failed"}` |
//! | Access denied | 403 | `{"error": "access denied: <perm> in namespace <ns>"}` |
//! | Executor failed | 502 | `{"error": …}` |
//! | Deadline passed | 504 | `{"error": …}` |
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use toolgate_server::{Config, DemoExecutor, GateRouter};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("toolgate.toml")?;
//! let parts = config.build_gate(Arc::new(DemoExecutor)).await?;
//!
//! let app = GateRouter::new(parts.gate).build()?;
//! let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod demo;
pub mod error;
pub mod handler;
pub mod router;
pub(crate) mod state;

// Re-exports
pub use config::{Config, ConfigError, GateParts};
pub use demo::DemoExecutor;
pub use error::{BuildError, ServerError, ServerResult};
pub use router::GateRouter;
