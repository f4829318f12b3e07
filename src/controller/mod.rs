use std::sync::Arc;

use futures_channel::mpsc;
use futures_util::StreamExt;
use tap::TapFallible;
use tokio::sync::watch;
use tracing::{error, info, info_span, Instrument};

use crate::cluster::{Extractor, ResourceKind, Scope, Subscribe};
use crate::error::Error;
use crate::router::{RouterClient, RouterSession};
use crate::sync::SyncEngine;

use coordinator::Coordinator;

mod coordinator;

/// Requests every coordinator of a [`Controller`] to close its watch.
#[derive(Clone)]
pub struct StopHandle {
    stop: Arc<watch::Sender<bool>>,
}

impl StopHandle {
    /// Idempotent, also honoured by coordinators that have not subscribed yet.
    pub fn stop(&self) {
        info!("stopping controller");

        self.stop.send_replace(true);
    }
}

pub struct Controller<S, C> {
    subscriber: Arc<S>,
    session: Arc<RouterSession<C>>,
    extractor: Arc<Extractor>,
    watches: Vec<ResourceKind>,
    scope: Scope,
    stop: StopHandle,
}

impl<S, C> Controller<S, C>
where
    S: Subscribe + 'static,
    C: RouterClient + 'static,
{
    pub fn new(
        subscriber: S,
        session: RouterSession<C>,
        extractor: Extractor,
        watches: Vec<ResourceKind>,
        scope: Scope,
    ) -> Self {
        let (stop, _) = watch::channel(false);

        Self {
            subscriber: Arc::new(subscriber),
            session: Arc::new(session),
            extractor: Arc::new(extractor),
            watches,
            scope,
            stop: StopHandle {
                stop: Arc::new(stop),
            },
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Start one coordinator per enabled watch, log in, then wait for all of
    /// them to finish. A failed login is returned at once without waiting.
    pub async fn run(&self) -> Result<(), Error> {
        let (done_sender, mut done_receiver) = mpsc::unbounded();
        let (session_ready, _) = watch::channel(false);
        let engine = SyncEngine::new(self.session.clone());

        for &kind in &self.watches {
            let coordinator = Coordinator::new(
                kind,
                self.scope.clone(),
                self.subscriber.clone(),
                self.extractor.clone(),
                engine.clone(),
                session_ready.subscribe(),
                self.stop.stop.subscribe(),
            );
            let done_sender = done_sender.clone();

            tokio::spawn(
                async move {
                    let result = coordinator.run().await;

                    // the receiver is gone when startup already failed
                    let _ = done_sender.unbounded_send((kind, result));
                }
                .instrument(info_span!("watch coordinator", %kind)),
            );
        }
        drop(done_sender);

        let expected = self.watches.len();

        info!(watches = ?self.watches, "spawn watch coordinators done");

        self.session
            .login()
            .await
            .tap_err(|err| error!(%err, "startup login failed"))?;
        session_ready.send_replace(true);

        info!("controller started");

        let mut failure = None;

        for finished in 0..expected {
            match done_receiver.next().await {
                Some((kind, Ok(()))) => {
                    info!(%kind, "watch coordinator finished");
                }

                Some((kind, Err(err))) => {
                    error!(%kind, %err, "watch coordinator failed");

                    failure.get_or_insert(err);
                }

                None => {
                    let missing = expected - finished;

                    error!(missing, "watch coordinators stopped without reporting");

                    failure.get_or_insert(Error::CoordinatorLost { missing });

                    break;
                }
            }
        }

        info!("controller finished");

        match failure {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
