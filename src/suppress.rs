use std::collections::HashMap;

use crate::host::DesiredHost;

/// Remembers the last address applied per service hostname, so watch
/// re-deliveries of an unchanged service cost no router round trip.
///
/// Owned by the single service watch coordinator, entries are never evicted.
#[derive(Debug, Default)]
pub struct SuppressionCache {
    last_applied: HashMap<String, String>,
}

impl SuppressionCache {
    pub fn should_apply(&self, domain: &str, ip: &str) -> bool {
        self.last_applied
            .get(domain)
            .map_or(true, |last_ip| last_ip != ip)
    }

    pub fn record(&mut self, domain: &str, ip: &str) {
        self.last_applied.insert(domain.to_string(), ip.to_string());
    }

    /// Keep only the hosts whose address differs from the last applied one.
    pub fn filter(&self, hosts: Vec<DesiredHost>) -> Vec<DesiredHost> {
        hosts
            .into_iter()
            .filter(|host| self.should_apply(&host.domain, &host.ip))
            .collect()
    }

    pub fn record_all(&mut self, hosts: &[DesiredHost]) {
        for host in hosts {
            self.record(&host.domain, &host.ip);
        }
    }
}
