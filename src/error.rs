use thiserror::Error;

use crate::cluster::ResourceKind;
use crate::router::RouterError;

#[derive(Error, Debug)]
pub enum Error {
    #[error("subscribe {kind} changes failed: {source}")]
    Subscription {
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("{kind} change stream failed: {source}")]
    Stream {
        kind: ResourceKind,
        #[source]
        source: anyhow::Error,
    },

    #[error("router login failed: {0}")]
    Auth(#[source] RouterError),

    #[error("fetch router dns table failed: {0}")]
    Fetch(#[source] RouterError),

    #[error("apply dns host {domain} -> {ip} failed: {source}")]
    RemoteApply {
        domain: String,
        ip: String,
        #[source]
        source: RouterError,
    },

    #[error("router session was never established")]
    SessionUnavailable,

    #[error("{missing} watch coordinator(s) stopped without reporting a result")]
    CoordinatorLost { missing: usize },
}
