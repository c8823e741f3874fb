mod app;
mod chain;
mod components;
mod config;
mod forms;
mod logging;
mod ui;

use clap::Parser;
use color_eyre::Result;
use config::{AppConfig, Cli};

fn main() -> Result<()> {
    color_eyre::install()?;
    let config = AppConfig::load(Cli::parse())?;
    logging::init(&config.log_file)?;

    let chain = config.chain_context()?;
    let connectors = config.connectors()?;
    tracing::info!(
        rpc_url = %chain.rpc_url,
        contract = %chain.contract_checksum(),
        connectors = connectors.len(),
        "starting todos-tui"
    );

    let app = app::App::new(chain, connectors)?;
    let terminal = ratatui::init();
    let result = app.run(terminal);
    ratatui::restore();
    result
}
