use std::path::PathBuf;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use http::Uri;
use reqwest::Url;

use crate::cluster::{ResourceKind, Scope};

const NAME_PLACEHOLDER: &str = "{name}";

#[derive(Parser)]
#[command(version, about)]
pub struct Config {
    #[arg(long, env = "ROUTER_URL", help = "Router web UI base url")]
    pub router_url: Url,

    #[arg(long, env = "ROUTER_USERNAME", help = "Router login user")]
    pub router_username: String,

    #[arg(
        long,
        env = "ROUTER_PASSWORD",
        hide_env_values = true,
        help = "Router login password"
    )]
    pub router_password: String,

    #[arg(
        long,
        env = "ROUTER_SERVICE_HOST_FORMAT",
        value_parser = parse_host_format,
        help = "Hostname template for LoadBalancer services, {name} is replaced by the service name"
    )]
    pub service_host_format: String,

    #[arg(
        long,
        env = "ROUTER_SERVICE_NO_INGRESSES",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        help = "Do not watch ingresses"
    )]
    pub no_ingresses: bool,

    #[arg(
        long,
        env = "ROUTER_SERVICE_NO_LOADBALANCERS",
        action = ArgAction::SetTrue,
        value_parser = BoolishValueParser::new(),
        help = "Do not watch LoadBalancer services"
    )]
    pub no_load_balancers: bool,

    #[arg(
        long,
        env = "ROUTER_WATCH_NAMESPACE",
        help = "Only watch this namespace, all namespaces if not set"
    )]
    pub namespace: Option<String>,

    #[arg(
        long,
        env = "ROUTER_KUBECONFIG_PATH",
        help = "Kubeconfig to use instead of the in-cluster or default one"
    )]
    pub kubeconfig: Option<PathBuf>,

    #[arg(
        long,
        env = "ROUTER_OVERRIDE_KUBERNETES_ENDPOINT",
        help = "Override the kubernetes api server url"
    )]
    pub kubernetes_endpoint: Option<Uri>,

    #[arg(long, env = "JAEGER_AGENT", help = "Export traces to this jaeger agent")]
    pub jaeger_agent: Option<String>,
}

impl Config {
    pub fn enabled_watches(&self) -> Vec<ResourceKind> {
        let mut watches = Vec::with_capacity(2);

        if !self.no_ingresses {
            watches.push(ResourceKind::Ingress);
        }
        if !self.no_load_balancers {
            watches.push(ResourceKind::Service);
        }

        watches
    }

    pub fn scope(&self) -> Scope {
        match &self.namespace {
            Some(namespace) if !namespace.is_empty() => Scope::Namespace(namespace.clone()),
            _ => Scope::All,
        }
    }
}

fn parse_host_format(format: &str) -> Result<String, String> {
    if !format.contains(NAME_PLACEHOLDER) {
        return Err(format!("host format must contain {NAME_PLACEHOLDER}"));
    }

    Ok(format.to_string())
}
