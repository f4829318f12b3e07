use std::fmt::{self, Display, Formatter};
use std::ops::Deref;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use k8s_openapi::api::core::v1::Service;
use k8s_openapi::api::networking::v1::Ingress;

pub use extract::Extractor;
pub use watch::KubeSubscriber;

mod extract;
mod watch;

/// The cluster resources a watch can be opened on.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum ResourceKind {
    Ingress,
    Service,
}

impl Display for ResourceKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ResourceKind::Ingress => f.write_str("ingress"),
            ResourceKind::Service => f.write_str("service"),
        }
    }
}

/// Namespaces a watch covers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Scope {
    All,
    Namespace(String),
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
}

/// A watched object, already narrowed to the resource it was watched as.
#[derive(Debug, Clone)]
pub enum ClusterObject {
    Ingress(Ingress),
    Service(Service),
}

impl ClusterObject {
    pub fn name(&self) -> &str {
        let metadata = match self {
            ClusterObject::Ingress(ingress) => &ingress.metadata,
            ClusterObject::Service(svc) => &svc.metadata,
        };

        metadata.name.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub object: ClusterObject,
}

pub type EventStream = BoxStream<'static, anyhow::Result<ChangeEvent>>;

/// Opens long lived subscriptions on cluster resources.
///
/// Dropping the returned stream closes the subscription.
#[async_trait]
pub trait Subscribe: Send + Sync {
    async fn subscribe(&self, kind: ResourceKind, scope: &Scope) -> anyhow::Result<EventStream>;
}

#[async_trait]
impl<S, T> Subscribe for T
where
    T: Deref<Target = S> + Send + Sync,
    S: Subscribe,
{
    async fn subscribe(&self, kind: ResourceKind, scope: &Scope) -> anyhow::Result<EventStream> {
        self.deref().subscribe(kind, scope).await
    }
}
