#![warn(
    missing_debug_implementations,
    rust_2018_idioms,
    missing_docs,
    rustdoc::broken_intra_doc_links,
    rustdoc::missing_crate_level_docs
)]

//! Mail relay server

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use smtp_relay::{
    domain::relay::RelayServiceImpl,
    infrastructure::{
        email::smtp::{SmtpMailer, SmtpMailerConfig},
        http::{state::AppState, HttpServer, HttpServerConfig},
        logging::{self, LogConfig},
    },
};
use tracing::{error, info};

/// Command-line arguments / environment variables
#[derive(Debug, Parser)]
pub struct Args {
    /// The HTTP server configuration
    #[clap(flatten)]
    pub server: HttpServerConfig,

    /// The SMTP client configuration
    #[clap(flatten)]
    pub smtp: SmtpMailerConfig,

    /// The logging configuration
    #[clap(flatten)]
    pub log: LogConfig,

    /// How many recipients of one request may be delivered at once
    #[arg(long, env = "MAX_CONCURRENT_DELIVERIES", default_value = "1")]
    pub max_concurrent_deliveries: usize,
}

#[mutants::skip]
#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    let log_sink = logging::init(&args.log)?;

    info!("Writing logs to {}", log_sink.path().display());

    let relay = RelayServiceImpl::new(Arc::new(SmtpMailer::new(args.smtp)))
        .with_max_concurrent_deliveries(args.max_concurrent_deliveries);

    let result = serve(relay, &args.server).await;

    if let Err(err) = &result {
        error!("{err:#}");
    }

    log_sink.close().context("failed to flush log file")?;

    result
}

#[mutants::skip]
async fn serve(relay: RelayServiceImpl<SmtpMailer>, config: &HttpServerConfig) -> Result<()> {
    HttpServer::new(AppState::new(relay), config)?.run().await
}
