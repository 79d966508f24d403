//! `campus-trace` entry-point: configuration, tracing and the command shell.

use std::sync::Arc;

use campus_trace::app::AppContext;
use campus_trace::config::AppConfig;
use campus_trace::inbound::cli::{Cli, run};
use campus_trace::outbound::oauth_callback::Prompt;
use clap::Parser;
use mockable::DefaultEnv;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};
use url::Url;

#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = AppConfig::from_env(&DefaultEnv::new())?;
    let prompt: Prompt = Arc::new(|url: &Url| {
        println!("Open this link to continue with Google:\n{url}");
    });
    let context = AppContext::start(&config, prompt).await?;

    let output = run(&context, cli.command).await?;
    println!("{output}");
    Ok(())
}

fn init_tracing(json: bool) {
    let builder = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr);
    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    if let Err(e) = result {
        warn!(error = %e, "tracing init failed");
    }
}
