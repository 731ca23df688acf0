use std::path::PathBuf;

use clap::Parser;

use bodeplot::{Config, MemoryDepth, Scope, SystemResourceManager};

/// Read the acquisition memory of one scope channel into a `time, volts` CSV file.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    channel: u8,
    /// Fix the memory depth before acquiring; the current depth is used otherwise.
    #[arg(long)]
    memory_depth: Option<usize>,
    #[arg(short, long, default_value = "waveform.csv")]
    output: PathBuf,
}

fn main() -> bodeplot::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let manager = SystemResourceManager::new(config.transport.clone());
    let mut scope = Scope::open(&manager, config.scope.bus, &config.scope.model)?;
    if let Some(depth) = args.memory_depth {
        scope.set_memory_depth(MemoryDepth::Points(depth))?;
    }

    let volts = scope.acquire_channel(args.channel)?;
    let sample_rate = scope.sample_rate()?;
    let time_offset = scope.time_offset()?;
    log::info!("CH{}: {} samples at {} Sa/s, {} s/div, {} V/div",
        args.channel, volts.len(), sample_rate, scope.timebase()?, scope.voltage_scale(args.channel)?);

    // the trigger point is at the center of the acquisition memory
    let center = volts.len() as f64 / 2.0;
    let mut writer = csv::Writer::from_path(&args.output)?;
    writer.write_record(["time", "volts"])?;
    for (index, value) in volts.iter().enumerate() {
        let time = (index as f64 - center) / sample_rate + time_offset;
        writer.write_record([time.to_string(), value.to_string()])?;
    }
    writer.flush().map_err(csv::Error::from)?;
    log::info!("wrote {}", args.output.display());
    Ok(())
}
