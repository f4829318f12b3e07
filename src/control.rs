use anyhow::Result;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use tracing::{info, instrument};

use crate::cluster::{Extractor, KubeSubscriber};
use crate::config::Config;
use crate::controller::Controller;
use crate::router::{HuaweiClient, RouterSession};

pub async fn run_controller(config: &Config) -> Result<()> {
    let client = kube_client(config).await?;

    info!("init k8s client");

    let router = HuaweiClient::new(
        config.router_url.clone(),
        &config.router_username,
        &config.router_password,
    )?;

    info!(url = %config.router_url, "init router client");

    let controller = Controller::new(
        KubeSubscriber::new(client),
        RouterSession::new(router),
        Extractor::new(&config.service_host_format),
        config.enabled_watches(),
        config.scope(),
    );

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("receive interrupt signal");

            stop.stop();
        }
    });

    controller.run().await?;

    Ok(())
}

#[instrument(err, skip_all)]
async fn kube_client(config: &Config) -> Result<Client> {
    let mut kube_config = match &config.kubeconfig {
        None => kube::Config::infer().await?,

        Some(path) => {
            let kubeconfig = Kubeconfig::read_from(path)?;

            kube::Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default()).await?
        }
    };

    if let Some(endpoint) = &config.kubernetes_endpoint {
        info!(%endpoint, "override kubernetes endpoint");

        kube_config.cluster_url = endpoint.clone();
    }

    Ok(Client::try_from(kube_config)?)
}
