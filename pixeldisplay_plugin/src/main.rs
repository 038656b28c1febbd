use anyhow::Context;
use pixeldisplay_plugin::{info_versions, Args, PluginConfig};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn init_tracing() {
    let filter = EnvFilter::try_from_env("PIXELDISPLAY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse_host_args(std::env::args_os()).unwrap_or_else(|e| e.exit());
    let config = PluginConfig::try_from(args).context("invalid launch parameters")?;

    let (app_version, plugin_version) = info_versions(&config.info);
    info!(
        uuid = %config.registration.uuid,
        app_version = app_version.unwrap_or("?"),
        plugin_version = plugin_version.unwrap_or("?"),
        "pixeldisplay starting"
    );
    debug!(info = %config.info, "host info");

    pixeldisplay_plugin::run(config).context("plugin stopped with an error")?;
    info!("device host disconnected; exiting");
    Ok(())
}
