//! Liveness-tracking presence registry.
//!
//! Clients call `GET /get-id` once to obtain an opaque 8-character identity,
//! then call `GET /keep-alive/<identity>` on a fixed interval. A background
//! reaper evicts any identity that stops renewing; an operator shell on
//! stdin can inspect and remove registrations by hand.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────────── presenced ─────────────────────────────┐
//! │                                                                     │
//! │   warp server ──────┐                                               │
//! │   (heartbeat API)   │                                               │
//! │                     ▼                                               │
//! │   reaper ────► ClientStore ◄──── operator shell (stdin)             │
//! │   (sweeps)     identity → (origin, last_seen)                       │
//! │                     │                                               │
//! │                     └────► access log (one record per request)      │
//! └─────────────────────────────────────────────────────────────────────┘
//!          ▲                    ▲                    ▲
//!     ┌─────────┐          ┌─────────┐          ┌─────────┐
//!     │ agent   │          │ agent   │          │ agent   │
//!     └─────────┘          └─────────┘          └─────────┘
//! ```
//!
//! The store is the only shared mutable state. Each of its operations is a
//! single critical section, so the server, the reaper, and the shell can run
//! concurrently without further coordination.

pub mod access_log;
pub mod agent;
pub mod registry;
pub mod shell;

// Re-export key types for convenience
pub use registry::{
    ClientRecord, ClientStore, ExpireOutcome, IDENTITY_ALPHABET, IDENTITY_LEN, IdentitySource,
    RandomIdentities, ReaperConfig, RemoveOutcome, RenewOutcome, ServeError, heartbeat_routes,
    is_valid_identity, run_reaper, start_server, sweep,
};

pub use access_log::{AccessLog, AccessLogRecord, spawn_writer};

pub use agent::{AgentConfig, AgentError, HeartbeatAgent, RenewStatus};

pub use shell::{Command, CommandError, describe_error, execute, parse_command, run_shell};
