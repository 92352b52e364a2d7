use azpager::args::Cli;
use azpager::{commands, config, logger};
use clap::Parser;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut app_config = config::load_config(cli.config.as_deref())?;
    app_config.apply_overrides(cli.endpoint.clone(), cli.api_version.clone());
    if let Err(errors) = app_config.validate() {
        for error in &errors {
            eprintln!("{error}\n");
        }
        anyhow::bail!("Invalid configuration ({} problem(s))", errors.len());
    }

    logger::setup_logger(app_config.logging(), cli.verbose)?;
    log::debug!("Starting azpager with {:?}", cli.command);

    commands::execute(cli, app_config.into_client()).await
}
