use std::io::Write;

use async_trait::async_trait;
use delaysqs_delayer::{DeliveryError, DeliveryHandler};
use tracing::info;

/// Writes each delivered payload as one line on stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutDelivery;

#[async_trait]
impl DeliveryHandler for StdoutDelivery {
    async fn deliver(&self, payload: &str) -> Result<(), DeliveryError> {
        let mut out = std::io::stdout().lock();
        writeln!(out, "{payload}")?;
        out.flush()?;
        Ok(())
    }
}

pub async fn run(delayer: &delaysqs_delayer::Delayer) -> anyhow::Result<()> {
    delayer.start_polling();
    info!("polling, press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    info!("interrupt received, waiting for the current poll cycle");
    delayer.shutdown().await;
    Ok(())
}
