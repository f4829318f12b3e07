use tracing::{info, instrument, warn};

use crate::error::Error;
use crate::host::{DesiredHost, RemoteHostEntry};
use crate::router::RouterClient;

/// Owns the router login and the one-shot re-login when a table read fails.
pub struct RouterSession<C> {
    client: C,
}

impl<C> RouterSession<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

impl<C: RouterClient> RouterSession<C> {
    #[instrument(err, skip(self))]
    pub async fn login(&self) -> Result<(), Error> {
        self.client.login().await.map_err(Error::Auth)?;

        info!("router login done");

        Ok(())
    }

    /// Read the whole table. A failed read is assumed to be an expired
    /// session: log in once and read again, any further failure is returned.
    #[instrument(err, skip(self))]
    pub async fn fetch_table(&self) -> Result<Vec<RemoteHostEntry>, Error> {
        match self.client.list_dns_hosts().await {
            Ok(table) => Ok(table),

            Err(err) => {
                warn!(%err, "list dns hosts failed, login again and retry");

                self.login().await?;

                self.client.list_dns_hosts().await.map_err(Error::Fetch)
            }
        }
    }

    #[instrument(err, skip_all, fields(%host))]
    pub async fn create_host(&self, host: &DesiredHost) -> Result<(), Error> {
        self.client
            .create_dns_host(host)
            .await
            .map_err(|source| apply_error(host, source))
    }

    #[instrument(err, skip_all, fields(%host, index = index))]
    pub async fn update_host(&self, host: &DesiredHost, index: usize) -> Result<(), Error> {
        self.client
            .update_dns_host(host, index)
            .await
            .map_err(|source| apply_error(host, source))
    }
}

fn apply_error(host: &DesiredHost, source: crate::router::RouterError) -> Error {
    Error::RemoteApply {
        domain: host.domain.clone(),
        ip: host.ip.clone(),
        source,
    }
}
