use itertools::Itertools;
use k8s_openapi::api::core::v1::{LoadBalancerIngress, Service};
use k8s_openapi::api::networking::v1::Ingress;

use crate::cluster::ClusterObject;
use crate::host::DesiredHost;

/// Label preferred over the object name when naming a service host, so the
/// object can be renamed without changing its hostname.
const NAME_LABEL: &str = "app.kubernetes.io/name";
const NAME_PLACEHOLDER: &str = "{name}";

const LOAD_BALANCER: &str = "LoadBalancer";

/// Maps watched objects to the hosts they should publish.
#[derive(Debug, Clone)]
pub struct Extractor {
    service_host_format: String,
}

impl Extractor {
    pub fn new(service_host_format: impl Into<String>) -> Self {
        Self {
            service_host_format: service_host_format.into(),
        }
    }

    /// Missing rules, hosts or addresses contribute nothing, they are not
    /// errors.
    pub fn extract(&self, object: &ClusterObject) -> Vec<DesiredHost> {
        match object {
            ClusterObject::Ingress(ingress) => ingress_hosts(ingress),
            ClusterObject::Service(svc) => self.service_hosts(svc),
        }
    }

    fn service_hosts(&self, svc: &Service) -> Vec<DesiredHost> {
        let is_lb_svc = svc
            .spec
            .as_ref()
            .and_then(|spec| spec.type_.as_deref())
            .map(|svc_type| svc_type == LOAD_BALANCER)
            .unwrap_or(false);

        if !is_lb_svc {
            return vec![];
        }

        let Some(host) = self.service_host_name(svc) else {
            return vec![];
        };

        let addresses = svc
            .status
            .as_ref()
            .and_then(|status| status.load_balancer.as_ref())
            .and_then(|lb| lb.ingress.as_deref());

        lb_ips(addresses)
            .map(|ip| DesiredHost::new(host.clone(), ip))
            .collect()
    }

    fn service_host_name(&self, svc: &Service) -> Option<String> {
        let name = svc
            .metadata
            .labels
            .as_ref()
            .and_then(|labels| labels.get(NAME_LABEL))
            .filter(|name| !name.is_empty())
            .or(svc.metadata.name.as_ref())?;

        Some(self.service_host_format.replace(NAME_PLACEHOLDER, name))
    }
}

/// Every rule host paired with every assigned address.
fn ingress_hosts(ingress: &Ingress) -> Vec<DesiredHost> {
    let addresses = ingress
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_deref());

    let rule_hosts = ingress
        .spec
        .as_ref()
        .and_then(|spec| spec.rules.as_deref())
        .unwrap_or_default()
        .iter()
        .filter_map(|rule| rule.host.as_deref())
        .filter(|host| !host.is_empty())
        .collect::<Vec<_>>();

    lb_ips(addresses)
        .cartesian_product(rule_hosts)
        .map(|(ip, host)| DesiredHost::new(host, ip))
        .collect()
}

fn lb_ips(addresses: Option<&[LoadBalancerIngress]>) -> impl Iterator<Item = &str> + Clone {
    addresses
        .unwrap_or_default()
        .iter()
        .filter_map(|lb_ingress| lb_ingress.ip.as_deref())
        .filter(|ip| !ip.is_empty())
}
