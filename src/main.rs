mod cli;
mod config;
mod geometry;
mod input;
mod listener;
mod monitor;
mod surface;
mod x11;

use anyhow::Context;
use clap::Parser;
use env_logger::Env;
use log::{info, warn};
use tokio::io::BufReader;

const SHORT_TIMEOUT_MS: u64 = 100;

fn main() -> anyhow::Result<()> {
    let args = cli::Args::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    if args.version {
        println!("Version {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.timeout == 0 {
        info!("timeout set to 0, the bar will stay on screen");
    } else if args.timeout < SHORT_TIMEOUT_MS {
        warn!("timeout of {} ms is very short", args.timeout);
    }

    let env = config::ConfigEnv::from_process();
    let (style, source) = config::load_style(args.config.as_deref(), &args.style, &env);
    if let Some(path) = source.filter(|_| !args.quiet) {
        println!("Reading configuration from {}.", path.display());
    }

    let display = x11::X11Display::connect().context("failed to connect to the X server")?;
    let monitor = monitor::resolve_monitor(&display, &style.monitor);
    let window = display
        .create_window()
        .context("failed to create the bar window")?;
    let bar = surface::Bar::open(window, style, monitor).context("failed to place the bar")?;

    let options = listener::Options {
        cap: args.cap,
        hide_after: args.hide_after(),
        quiet: args.quiet,
    };
    let input = input::UpdateReader::new(BufReader::new(tokio::io::stdin()));
    let mut listener = listener::Listener::new(bar, display, input, options);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start the runtime")?;
    runtime.block_on(listener.run())?;
    listener.close();
    Ok(())
}
