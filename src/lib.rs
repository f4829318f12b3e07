use anyhow::Result;
use clap::Parser;

use crate::config::Config;

mod cluster;
mod config;
mod control;
mod controller;
mod error;
mod host;
mod router;
mod suppress;
mod sync;
#[cfg(test)]
mod testing;
mod trace;

pub async fn run() -> Result<()> {
    let config = Config::parse();

    trace::init_tracing(config.jaeger_agent.as_deref())?;

    let result = control::run_controller(&config).await;

    trace::stop_tracing();

    result
}
