use std::sync::Arc;

use tracing::{info, instrument};

use crate::error::Error;
use crate::host::{self, DesiredHost, RemoteHostEntry};
use crate::router::{RouterClient, RouterSession};

/// What has to happen on the router for one desired host.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
enum HostAction {
    Create,
    Update { index: usize },
    UpToDate,
}

/// Brings the router table in line with batches of desired hosts.
pub struct SyncEngine<C> {
    session: Arc<RouterSession<C>>,
}

impl<C> Clone for SyncEngine<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
        }
    }
}

impl<C: RouterClient> SyncEngine<C> {
    pub fn new(session: Arc<RouterSession<C>>) -> Self {
        Self { session }
    }

    /// Hosts are applied in batch order and the first failed create or
    /// update aborts the rest of the batch.
    #[instrument(err, skip_all, fields(hosts = desired.len()))]
    pub async fn sync(&self, desired: &[DesiredHost]) -> Result<(), Error> {
        if desired.is_empty() {
            return Ok(());
        }

        // never reuse a table across batches, other clients edit it too
        let existing = self.session.fetch_table().await?;

        info!(existing = existing.len(), "fetch router dns table done");

        for (host, action) in plan(&existing, desired) {
            match action {
                HostAction::UpToDate => {
                    info!(%host.domain, %host.ip, "host is up to date");
                }

                HostAction::Create => {
                    info!(%host.domain, %host.ip, "create dns host");

                    self.session.create_host(host).await?;
                }

                HostAction::Update { index } => {
                    info!(%host.domain, %host.ip, index, "update dns host");

                    self.session.update_host(host, index).await?;
                }
            }
        }

        info!("sync dns hosts done");

        Ok(())
    }
}

fn plan<'a>(existing: &[RemoteHostEntry], desired: &'a [DesiredHost]) -> Vec<(&'a DesiredHost, HostAction)> {
    // a domain listed twice keeps its last address
    host::last_per_domain(desired)
        .into_iter()
        .map(|host| {
            let action = match existing.iter().find(|entry| entry.domain == host.domain) {
                None => HostAction::Create,
                Some(entry) if entry.ip == host.ip => HostAction::UpToDate,
                Some(entry) => HostAction::Update { index: entry.index },
            };

            (host, action)
        })
        .collect()
}
