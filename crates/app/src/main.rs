//! Entry point: logging + command line, then hand over to the platform loop.

mod config;

use anyhow::Result;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = config::parse_args(std::env::args().skip(1))?;
    log::info!(
        "Starting objscene. Models: {:?}, backends: {:?}, window_size={}x{}",
        config.scene.models,
        config.scene.backends,
        config.width,
        config.height
    );

    platform::run_with_renderer(config)?;

    log::info!("Graceful shutdown. Bye!");
    Ok(())
}
