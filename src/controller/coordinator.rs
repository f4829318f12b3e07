use std::sync::Arc;

use futures_util::{future, StreamExt};
use tap::TapFallible;
use tokio::sync::watch;
use tracing::{error, info, instrument};

use crate::cluster::{ChangeEvent, Extractor, ResourceKind, Scope, Subscribe};
use crate::error::Error;
use crate::host::{self, DesiredHost};
use crate::router::RouterClient;
use crate::suppress::SuppressionCache;
use crate::sync::SyncEngine;

/// Owns one subscription and pushes every event it delivers to the router.
pub struct Coordinator<S, C> {
    kind: ResourceKind,
    scope: Scope,
    subscriber: Arc<S>,
    extractor: Arc<Extractor>,
    engine: SyncEngine<C>,
    // only the service watch suppresses unchanged addresses
    suppression: Option<SuppressionCache>,
    session_ready: watch::Receiver<bool>,
    stop: watch::Receiver<bool>,
}

impl<S, C> Coordinator<S, C>
where
    S: Subscribe,
    C: RouterClient,
{
    pub fn new(
        kind: ResourceKind,
        scope: Scope,
        subscriber: Arc<S>,
        extractor: Arc<Extractor>,
        engine: SyncEngine<C>,
        session_ready: watch::Receiver<bool>,
        stop: watch::Receiver<bool>,
    ) -> Self {
        let suppression = match kind {
            ResourceKind::Service => Some(SuppressionCache::default()),
            ResourceKind::Ingress => None,
        };

        Self {
            kind,
            scope,
            subscriber,
            extractor,
            engine,
            suppression,
            session_ready,
            stop,
        }
    }

    /// Runs until the subscription ends, a stop is requested or an event
    /// cannot be synced. Only the last one is an error.
    #[instrument(err, skip(self), fields(kind = %self.kind))]
    pub async fn run(mut self) -> Result<(), Error> {
        let kind = self.kind;
        let mut stop = self.stop.clone();

        info!(scope = ?self.scope, "start watch");

        let subscribed = tokio::select! {
            biased;

            _ = stop_requested(&mut stop) => {
                info!("stop requested before subscribing");

                return Ok(());
            }

            subscribed = self.subscriber.subscribe(kind, &self.scope) => subscribed,
        };

        let mut stream = subscribed
            .map_err(|source| Error::Subscription { kind, source })
            .tap_err(|err| error!(%err, "subscribe failed"))?;

        let mut session_checked = false;

        loop {
            let event = tokio::select! {
                biased;

                _ = stop_requested(&mut stop) => {
                    info!("stop requested, close watch");

                    break;
                }

                event = stream.next() => event,
            };

            let event = match event {
                None => break,

                Some(Err(source)) => {
                    return Err(Error::Stream { kind, source })
                        .tap_err(|err| error!(%err, "change stream failed"));
                }

                Some(Ok(event)) => event,
            };

            info!(change = ?event.kind, name = %event.object.name(), "get change event");

            let hosts = self.desired_hosts(&event);
            if hosts.is_empty() {
                continue;
            }

            if !session_checked {
                tokio::select! {
                    biased;

                    _ = stop_requested(&mut stop) => break,

                    established = session_established(&mut self.session_ready) => {
                        if !established {
                            return Err(Error::SessionUnavailable)
                                .tap_err(|err| error!(%err, "cannot sync"));
                        }
                    }
                }

                session_checked = true;
            }

            info!(name = %event.object.name(), hosts = hosts.len(), "react to change event");

            self.engine
                .sync(&hosts)
                .await
                .tap_err(|err| error!(%err, "sync dns hosts failed, stop watching"))?;

            if let Some(suppression) = self.suppression.as_mut() {
                suppression.record_all(&hosts);
            }
        }

        info!("finish watch");

        Ok(())
    }

    fn desired_hosts(&self, event: &ChangeEvent) -> Vec<DesiredHost> {
        let extracted = self.extractor.extract(&event.object);
        // collapse before suppressing, the cache has to see what gets applied
        let hosts = host::last_per_domain(&extracted)
            .into_iter()
            .cloned()
            .collect();

        match &self.suppression {
            Some(suppression) => suppression.filter(hosts),
            None => hosts,
        }
    }
}

/// Resolves once a stop was requested. A dropped sender never stops.
async fn stop_requested(stop: &mut watch::Receiver<bool>) {
    let stopped = stop.wait_for(|stopped| *stopped).await.is_ok();

    if !stopped {
        future::pending::<()>().await;
    }
}

/// False when the startup login gave up before succeeding.
async fn session_established(ready: &mut watch::Receiver<bool>) -> bool {
    ready.wait_for(|ready| *ready).await.is_ok()
}
