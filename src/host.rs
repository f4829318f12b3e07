use std::fmt::{self, Display, Formatter};

use itertools::Itertools;

/// A hostname that should resolve to `ip` on the router.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DesiredHost {
    pub domain: String,
    pub ip: String,
}

impl DesiredHost {
    pub fn new(domain: impl Into<String>, ip: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            ip: ip.into(),
        }
    }
}

impl Display for DesiredHost {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.domain, self.ip)
    }
}

/// Keep one host per domain, the last one listed, in the order the kept
/// hosts were listed.
pub fn last_per_domain<'a, I>(hosts: I) -> Vec<&'a DesiredHost>
where
    I: IntoIterator<Item = &'a DesiredHost>,
    I::IntoIter: DoubleEndedIterator,
{
    let mut hosts = hosts
        .into_iter()
        .rev()
        .unique_by(|host| host.domain.clone())
        .collect::<Vec<_>>();
    hosts.reverse();

    hosts
}

/// One row of the router's static DNS table.
///
/// `index` identifies the row when updating it, in whatever numbering the
/// appliance uses. It is only meaningful for the listing it was read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteHostEntry {
    pub domain: String,
    pub ip: String,
    pub index: usize,
}
