//! Test doubles shared by the unit tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use futures_channel::mpsc::{self, UnboundedSender};
use futures_util::StreamExt;
use k8s_openapi::api::core::v1::{
    LoadBalancerIngress, LoadBalancerStatus, Service, ServiceSpec, ServiceStatus,
};
use k8s_openapi::api::networking::v1::{Ingress, IngressRule, IngressSpec, IngressStatus};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;

use crate::cluster::{ChangeEvent, ChangeKind, ClusterObject, EventStream, ResourceKind, Scope, Subscribe};
use crate::host::{DesiredHost, RemoteHostEntry};
use crate::router::{RouterClient, RouterError};

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Call {
    Login,
    List,
    Create(DesiredHost),
    Update(DesiredHost, usize),
}

#[derive(Default)]
struct RouterState {
    table: Vec<(String, String)>,
    calls: Vec<Call>,
    list_failures: usize,
    login_failures: usize,
    failing_domains: HashSet<String>,
}

/// In-memory router table recording every call made to it.
#[derive(Default)]
pub struct MockRouter {
    state: Mutex<RouterState>,
}

impl MockRouter {
    pub fn with_table(entries: &[(&str, &str)]) -> Self {
        let router = Self::default();
        router.state.lock().unwrap().table = entries
            .iter()
            .map(|(domain, ip)| (domain.to_string(), ip.to_string()))
            .collect();

        router
    }

    pub fn fail_next_lists(&self, count: usize) {
        self.state.lock().unwrap().list_failures = count;
    }

    pub fn fail_next_logins(&self, count: usize) {
        self.state.lock().unwrap().login_failures = count;
    }

    /// Creates and updates of `domain` fail.
    pub fn fail_apply_for(&self, domain: &str) {
        self.state
            .lock()
            .unwrap()
            .failing_domains
            .insert(domain.to_string());
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn login_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Login))
            .count()
    }

    pub fn mutation_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|call| matches!(call, Call::Create(_) | Call::Update(..)))
            .count()
    }
}

#[async_trait]
impl RouterClient for MockRouter {
    async fn login(&self) -> Result<(), RouterError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Login);

        if state.login_failures > 0 {
            state.login_failures -= 1;

            return Err(RouterError::LoginRejected("admin".to_string()));
        }

        Ok(())
    }

    async fn list_dns_hosts(&self) -> Result<Vec<RemoteHostEntry>, RouterError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::List);

        if state.list_failures > 0 {
            state.list_failures -= 1;

            return Err(RouterError::SessionExpired);
        }

        Ok(state
            .table
            .iter()
            .enumerate()
            .map(|(index, (domain, ip))| RemoteHostEntry {
                domain: domain.clone(),
                ip: ip.clone(),
                index,
            })
            .collect())
    }

    async fn create_dns_host(&self, host: &DesiredHost) -> Result<(), RouterError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Create(host.clone()));

        if state.failing_domains.contains(&host.domain) {
            return Err(RouterError::Unexpected("create rejected".to_string()));
        }

        state.table.push((host.domain.clone(), host.ip.clone()));

        Ok(())
    }

    async fn update_dns_host(&self, host: &DesiredHost, index: usize) -> Result<(), RouterError> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::Update(host.clone(), index));

        if state.failing_domains.contains(&host.domain) {
            return Err(RouterError::Unexpected("update rejected".to_string()));
        }

        match state.table.get_mut(index) {
            Some(entry) => {
                *entry = (host.domain.clone(), host.ip.clone());

                Ok(())
            }

            None => Err(RouterError::Unexpected(format!("no entry at {index}"))),
        }
    }
}

type EventSender = UnboundedSender<anyhow::Result<ChangeEvent>>;

/// Subscriptions fed by channels the test holds the sending side of.
///
/// Dropping the sender ends the subscription normally.
#[derive(Default)]
pub struct MockSubscriber {
    streams: Mutex<HashMap<ResourceKind, EventStream>>,
    failing: Mutex<HashSet<ResourceKind>>,
    subscribed: Mutex<Vec<(ResourceKind, Scope)>>,
}

impl MockSubscriber {
    pub fn channel(&self, kind: ResourceKind) -> EventSender {
        let (sender, receiver) = mpsc::unbounded();
        self.streams.lock().unwrap().insert(kind, receiver.boxed());

        sender
    }

    pub fn fail(&self, kind: ResourceKind) {
        self.failing.lock().unwrap().insert(kind);
    }

    pub fn subscribed(&self) -> Vec<(ResourceKind, Scope)> {
        self.subscribed.lock().unwrap().clone()
    }
}

#[async_trait]
impl Subscribe for MockSubscriber {
    async fn subscribe(&self, kind: ResourceKind, scope: &Scope) -> anyhow::Result<EventStream> {
        self.subscribed.lock().unwrap().push((kind, scope.clone()));

        if self.failing.lock().unwrap().contains(&kind) {
            return Err(anyhow::anyhow!("{kind} is forbidden"));
        }

        self.streams
            .lock()
            .unwrap()
            .remove(&kind)
            .ok_or_else(|| anyhow::anyhow!("no {kind} channel"))
    }
}

fn lb_status(ips: &[&str]) -> LoadBalancerStatus {
    LoadBalancerStatus {
        ingress: Some(
            ips.iter()
                .map(|ip| LoadBalancerIngress {
                    ip: Some(ip.to_string()),
                    ..Default::default()
                })
                .collect(),
        ),
        ..Default::default()
    }
}

pub fn ingress(name: &str, hosts: &[&str], ips: &[&str]) -> Ingress {
    Ingress {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            ..Default::default()
        },
        spec: Some(IngressSpec {
            rules: Some(
                hosts
                    .iter()
                    .map(|host| IngressRule {
                        host: Some(host.to_string()),
                        ..Default::default()
                    })
                    .collect(),
            ),
            ..Default::default()
        }),
        status: Some(IngressStatus {
            load_balancer: Some(lb_status(ips)),
            ..Default::default()
        }),
    }
}

pub fn service(name: &str, svc_type: &str, name_label: Option<&str>, ips: &[&str]) -> Service {
    Service {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some("default".to_string()),
            labels: name_label.map(|label| {
                BTreeMap::from([("app.kubernetes.io/name".to_string(), label.to_string())])
            }),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            type_: Some(svc_type.to_string()),
            ..Default::default()
        }),
        status: Some(ServiceStatus {
            load_balancer: Some(lb_status(ips)),
            ..Default::default()
        }),
    }
}

pub fn applied(object: ClusterObject) -> anyhow::Result<ChangeEvent> {
    Ok(ChangeEvent {
        kind: ChangeKind::Modified,
        object,
    })
}
