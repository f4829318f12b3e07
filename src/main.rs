use anyhow::Result;
use homelab_router_dns::run;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    run().await
}
