//! Client Liveness Registry
//!
//! Clients register to obtain an opaque identity token, renew it with
//! periodic keep-alive calls, and are evicted once renewals stop. The store
//! is the single shared data structure; the HTTP surface, the reaper, and
//! the operator shell all operate against one instance passed in explicitly.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────────────┐
//!                    │      presenced server       │
//!                    │                             │
//!                    │  GET /get-id                │
//!                    │  GET /keep-alive/<identity> │
//!                    │  GET /health                │
//!                    └──────────────┬──────────────┘
//!                                   │
//!            ┌──────────────────────┼──────────────────────┐
//!            │                      │                      │
//!            ▼                      ▼                      ▼
//!       ┌─────────┐           ┌─────────┐            ┌─────────┐
//!       │ Agent A │           │ Agent B │            │ Agent C │
//!       └─────────┘           └─────────┘            └─────────┘
//! ```
//!
//! Server side, three loops share the [`ClientStore`]: the warp server
//! translating requests into store operations, the reaper sweeping stale
//! records, and the operator shell reading commands from stdin.
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use presence_registry::access_log::spawn_writer;
//! use presence_registry::registry::{run_reaper, start_server, ClientStore, ReaperConfig};
//! use tokio::sync::watch;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(ClientStore::new());
//! let (access_log, _writer) = spawn_writer("access.log".into());
//! let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! tokio::spawn(run_reaper(
//!     Arc::clone(&store),
//!     ReaperConfig::default(),
//!     shutdown_rx.clone(),
//! ));
//!
//! let (addr, server) = start_server(store, access_log, "0.0.0.0:8000".parse()?, shutdown_rx)?;
//! println!("listening on {addr}");
//! server.await;
//! # Ok(())
//! # }
//! ```

mod api;
mod identity;
mod reaper;
mod store;
mod types;

pub use api::{ServeError, heartbeat_routes, start_server};
pub use identity::{
    IDENTITY_ALPHABET, IDENTITY_LEN, IdentitySource, RandomIdentities, is_valid_identity,
};
pub use reaper::{ReaperConfig, run_reaper, sweep};
pub use store::ClientStore;
pub use types::{ClientRecord, ExpireOutcome, RemoveOutcome, RenewOutcome};
