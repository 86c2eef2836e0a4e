//! Prism: live camera capture with selectable real-time filters

use std::path::PathBuf;

use color_eyre::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use prism::capture::{self, FrameSource};
use prism::{Config, FrameScheduler};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("prism=info")),
        )
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Prism launching...");

    // Load configuration
    let config_path = std::env::args_os()
        .nth(1)
        .or_else(|| std::env::var_os("PRISM_CONFIG"))
        .map(PathBuf::from);
    let config = Config::load(config_path.as_deref())?;

    let source = capture::build_source(&config.capture);
    info!("Using capture device: {}", source.describe());

    run(config, source).await?;

    info!("Prism shutting down");
    Ok(())
}

#[cfg(feature = "sdl-display")]
async fn run(config: Config, source: Box<dyn FrameSource>) -> Result<()> {
    use color_eyre::eyre::eyre;
    use prism::display::{ChannelSink, Sdl2Display};

    let (sink, rx) = ChannelSink::pair();
    let scheduler = FrameScheduler::from_config(source, sink, &config);
    let (controls, commands) = scheduler.control_channel();
    let stats = scheduler.stats();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    if config.pipeline.autostart {
        controls.start();
    }

    // SDL must stay on the main thread
    let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
    let mut display = Sdl2Display::new(&sdl_context, &config.display)?;
    let shown = display.run(&sdl_context, rx, &controls, &stats);

    controls.shutdown();
    let source = tick_loop.await?;
    info!(
        "Device {:?} after {:?}",
        source.state(),
        stats.snapshot()
    );
    shown
}

#[cfg(not(feature = "sdl-display"))]
async fn run(config: Config, source: Box<dyn FrameSource>) -> Result<()> {
    use prism::display::HeadlessSink;

    let sink = HeadlessSink::new(config.pipeline.log_every);
    let scheduler = FrameScheduler::from_config(source, sink, &config);
    let (controls, commands) = scheduler.control_channel();
    let stats = scheduler.stats();
    let tick_loop = tokio::spawn(scheduler.run(commands));

    info!("No display built in, running headless until Ctrl-C");
    controls.start();
    tokio::signal::ctrl_c().await?;

    controls.shutdown();
    let source = tick_loop.await?;
    info!(
        "Device {:?} after {:?}",
        source.state(),
        stats.snapshot()
    );
    Ok(())
}
