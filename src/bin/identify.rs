use std::path::PathBuf;

use clap::Parser;

use bodeplot::{Bus, Config, Instrument, ResourceManager, SystemResourceManager};

/// List the instruments reachable on the configured buses.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Only list resources on this bus.
    #[arg(long, value_enum)]
    bus: Option<Bus>,
}

fn main() -> bodeplot::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let manager = SystemResourceManager::new(config.transport);
    for resource in manager.list_resources()? {
        if args.bus.is_some_and(|bus| bus != resource.bus()) {
            continue
        }
        match manager.open(&resource)
                .and_then(|transport| Instrument::from_transport(resource.clone(), transport)) {
            Ok(instrument) => println!("{}\t{}", resource, instrument.identity()),
            Err(error) => log::warn!("{}: {}", resource, error),
        }
    }
    Ok(())
}
