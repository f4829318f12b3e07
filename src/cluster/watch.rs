use std::fmt::Debug;

use async_trait::async_trait;
use futures_util::{future, StreamExt, TryStreamExt};
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;
use kube::api::{ListParams, WatchEvent};
use kube::{Api, Client};
use serde::de::DeserializeOwned;
use tracing::{debug, info, instrument, warn};

use crate::cluster::{ChangeEvent, ChangeKind, ClusterObject, EventStream, ResourceKind, Scope, Subscribe};

/// [`Subscribe`] backed by the Kubernetes watch API.
#[derive(Clone)]
pub struct KubeSubscriber {
    client: Client,
}

impl KubeSubscriber {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Subscribe for KubeSubscriber {
    #[instrument(err, skip(self))]
    async fn subscribe(&self, kind: ResourceKind, scope: &Scope) -> anyhow::Result<EventStream> {
        let client = self.client.clone();

        let stream = match kind {
            ResourceKind::Ingress => {
                let api: Api<Ingress> = match scope {
                    Scope::All => Api::all(client),
                    Scope::Namespace(ns) => Api::namespaced(client, ns),
                };

                watch_events(api, ClusterObject::Ingress).await?
            }

            ResourceKind::Service => {
                let api: Api<Service> = match scope {
                    Scope::All => Api::all(client),
                    Scope::Namespace(ns) => Api::namespaced(client, ns),
                };

                watch_events(api, ClusterObject::Service).await?
            }
        };

        info!(%kind, ?scope, "watch opened");

        Ok(stream)
    }
}

async fn watch_events<K>(api: Api<K>, wrap: fn(K) -> ClusterObject) -> anyhow::Result<EventStream>
where
    K: Clone + DeserializeOwned + Debug + Send + 'static,
{
    // "0" lets the api server start from its cache, existing objects are
    // delivered as Added first
    let stream = api.watch(&ListParams::default(), "0").await?;

    Ok(stream
        .map_err(anyhow::Error::from)
        .try_filter_map(move |event| future::ok(to_change_event(event, wrap)))
        .boxed())
}

fn to_change_event<K>(event: WatchEvent<K>, wrap: fn(K) -> ClusterObject) -> Option<ChangeEvent> {
    let (kind, object) = match event {
        WatchEvent::Added(obj) => (ChangeKind::Added, obj),
        WatchEvent::Modified(obj) => (ChangeKind::Modified, obj),
        WatchEvent::Deleted(obj) => (ChangeKind::Deleted, obj),

        WatchEvent::Bookmark(_) => {
            debug!("skip watch bookmark");

            return None;
        }

        WatchEvent::Error(err) => {
            warn!(code = err.code, reason = %err.reason, message = %err.message, "watch sent an error frame, skip it");

            return None;
        }
    };

    Some(ChangeEvent {
        kind,
        object: wrap(object),
    })
}
