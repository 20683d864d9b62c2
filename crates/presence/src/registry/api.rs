//! HTTP surface of the heartbeat protocol.
//!
//! Three plain-text endpoints map onto store operations:
//!
//! - `GET /get-id` issues a fresh identity (registration),
//! - `GET /keep-alive/<identity>` refreshes it, answering `401 Unauthorized`
//!   when the identity is unknown so the client knows it must re-register,
//! - `GET /health` reports service liveness independent of any client.
//!
//! Everything else, including wrong methods on known paths, is `404`. Each
//! handled request feeds one record to the access log.

use std::convert::Infallible;
use std::future::Future;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use warp::Filter;
use warp::http::StatusCode;

use crate::access_log::{AccessLog, AccessLogRecord};

use super::store::ClientStore;
use super::types::RenewOutcome;

/// Failure to bring the HTTP server up. Fatal to the process.
#[derive(Debug, Error)]
pub enum ServeError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: warp::Error,
    },
}

fn with_store(
    store: Arc<ClientStore>,
) -> impl Filter<Extract = (Arc<ClientStore>,), Error = Infallible> + Clone {
    warp::any().map(move || store.clone())
}

/// Peer address of the request, or the unspecified address when the
/// transport cannot supply one (e.g. in-memory test requests).
fn peer_ip(addr: Option<SocketAddr>) -> IpAddr {
    addr.map_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED), |a| a.ip())
}

/// The full route tree, with the access-log filter applied.
pub fn heartbeat_routes(
    store: Arc<ClientStore>,
    access_log: AccessLog,
) -> impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone {
    let get_id = warp::path("get-id")
        .and(warp::path::end())
        .and(warp::get())
        .and(warp::addr::remote())
        .and(with_store(store.clone()))
        .map(|addr: Option<SocketAddr>, store: Arc<ClientStore>| {
            let origin = peer_ip(addr);
            let identity = store.register(origin);
            info!(%identity, %origin, "issued identity");
            identity
        });

    let keep_alive = warp::path!("keep-alive" / String)
        .and(warp::get())
        .and(warp::addr::remote())
        .and(with_store(store))
        .map(
            |identity: String, addr: Option<SocketAddr>, store: Arc<ClientStore>| {
                let origin = peer_ip(addr);
                match store.renew(&identity, origin) {
                    RenewOutcome::Renewed => {
                        debug!(%identity, %origin, "keep-alive renewed");
                        warp::reply::with_status("OK", StatusCode::OK)
                    }
                    RenewOutcome::Unknown => {
                        warn!(%identity, %origin, "keep-alive rejected, identity unknown");
                        warp::reply::with_status("Unauthorized", StatusCode::UNAUTHORIZED)
                    }
                }
            },
        );

    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| "OK");

    let log = warp::log::custom(move |info| {
        access_log.record(AccessLogRecord::new(
            peer_ip(info.remote_addr()),
            info.method().as_str(),
            info.path(),
            &format!("{:?}", info.version()),
            info.status().as_u16(),
        ));
    });

    get_id
        .or(keep_alive)
        .or(health)
        .recover(handle_rejection)
        .with(log)
}

/// Anything unrouted, malformed, or using the wrong method becomes a plain
/// `404`, distinct from the `401` a recognized-but-unknown renewal gets.
async fn handle_rejection(_err: warp::Rejection) -> Result<impl warp::Reply, Infallible> {
    Ok(warp::reply::with_status("404", StatusCode::NOT_FOUND))
}

/// Bind the heartbeat server on `addr`.
///
/// Returns the bound address (useful when binding port 0) and the server
/// future, which runs until the shutdown channel fires or its sender is
/// dropped. A bind failure is returned immediately so the caller can exit
/// non-zero.
pub fn start_server(
    store: Arc<ClientStore>,
    access_log: AccessLog,
    addr: SocketAddr,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(SocketAddr, impl Future<Output = ()>), ServeError> {
    let routes = heartbeat_routes(store, access_log);
    warp::serve(routes)
        .try_bind_with_graceful_shutdown(addr, async move {
            let _ = shutdown.changed().await;
        })
        .map_err(|source| ServeError::Bind { addr, source })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::spawn_writer;
    use crate::registry::identity::is_valid_identity;
    use tempfile::TempDir;

    fn test_routes() -> (
        impl Filter<Extract = impl warp::Reply, Error = Infallible> + Clone,
        Arc<ClientStore>,
        TempDir,
    ) {
        let store = Arc::new(ClientStore::new());
        let dir = tempfile::tempdir().unwrap();
        let (access_log, _writer) = spawn_writer(dir.path().join("access.log"));
        let routes = heartbeat_routes(Arc::clone(&store), access_log);
        (routes, store, dir)
    }

    #[tokio::test]
    async fn test_get_id_issues_and_registers_identity() {
        let (routes, store, _dir) = test_routes();
        let reply = warp::test::request()
            .method("GET")
            .path("/get-id")
            .reply(&routes)
            .await;
        assert_eq!(reply.status(), StatusCode::OK);
        let identity = std::str::from_utf8(reply.body()).unwrap();
        assert!(is_valid_identity(identity));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_keep_alive_known_identity_is_ok() {
        let (routes, store, _dir) = test_routes();
        let identity = store.register(IpAddr::V4(Ipv4Addr::LOCALHOST));
        let reply = warp::test::request()
            .method("GET")
            .path(&format!("/keep-alive/{identity}"))
            .reply(&routes)
            .await;
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.body(), "OK");
    }

    #[tokio::test]
    async fn test_keep_alive_unknown_identity_is_unauthorized() {
        let (routes, _store, _dir) = test_routes();
        let reply = warp::test::request()
            .method("GET")
            .path("/keep-alive/ZZZZZZZZ")
            .reply(&routes)
            .await;
        assert_eq!(reply.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(reply.body(), "Unauthorized");
    }

    #[tokio::test]
    async fn test_health_is_ok_without_any_registration() {
        let (routes, _store, _dir) = test_routes();
        let reply = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(reply.status(), StatusCode::OK);
        assert_eq!(reply.body(), "OK");
    }

    #[tokio::test]
    async fn test_unknown_path_is_404() {
        let (routes, _store, _dir) = test_routes();
        let reply = warp::test::request()
            .method("GET")
            .path("/unknown-path")
            .reply(&routes)
            .await;
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
        assert_eq!(reply.body(), "404");
    }

    #[tokio::test]
    async fn test_wrong_method_is_404() {
        let (routes, _store, _dir) = test_routes();
        let reply = warp::test::request()
            .method("POST")
            .path("/health")
            .reply(&routes)
            .await;
        assert_eq!(reply.status(), StatusCode::NOT_FOUND);
        assert_eq!(reply.body(), "404");
    }
}
