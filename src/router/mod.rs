use std::ops::Deref;

use async_trait::async_trait;
use thiserror::Error;

use crate::host::{DesiredHost, RemoteHostEntry};

pub use huawei::HuaweiClient;
pub use session::RouterSession;

mod huawei;
mod session;

#[derive(Error, Debug)]
pub enum RouterError {
    #[error("router request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("router rejected login for user {0}")]
    LoginRejected(String),

    #[error("router session expired")]
    SessionExpired,

    #[error("unexpected router response: {0}")]
    Unexpected(String),
}

/// The static DNS table of a router appliance.
///
/// Implementations only talk to the appliance, retrying and deciding what
/// to change is done by [`RouterSession`] and the sync engine.
#[async_trait]
pub trait RouterClient: Send + Sync {
    async fn login(&self) -> Result<(), RouterError>;

    async fn list_dns_hosts(&self) -> Result<Vec<RemoteHostEntry>, RouterError>;

    async fn create_dns_host(&self, host: &DesiredHost) -> Result<(), RouterError>;

    async fn update_dns_host(&self, host: &DesiredHost, index: usize) -> Result<(), RouterError>;
}

#[async_trait]
impl<C, T> RouterClient for T
where
    T: Deref<Target = C> + Send + Sync,
    C: RouterClient,
{
    async fn login(&self) -> Result<(), RouterError> {
        self.deref().login().await
    }

    async fn list_dns_hosts(&self) -> Result<Vec<RemoteHostEntry>, RouterError> {
        self.deref().list_dns_hosts().await
    }

    async fn create_dns_host(&self, host: &DesiredHost) -> Result<(), RouterError> {
        self.deref().create_dns_host(host).await
    }

    async fn update_dns_host(&self, host: &DesiredHost, index: usize) -> Result<(), RouterError> {
        self.deref().update_dns_host(host, index).await
    }
}
