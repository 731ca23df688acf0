use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use clap::Parser;

use bodeplot::{
    Config, Error, ErrorPolicy, Instrument, Scope, SignalGenerator, Sweep, SweepReport,
    SystemResourceManager, Transport,
};

/// Measure the frequency response of a circuit driven by the signal generator.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// TOML configuration; defaults are used when absent.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Gain of the response channel relative to the reference channel.
    #[arg(short, long)]
    gain_correction: Option<f64>,
    /// CSV file to write.
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// What to do with a step that cannot be measured.
    #[arg(long, value_enum)]
    on_error: Option<ErrorPolicy>,
}

fn prompt_gain_correction() -> bodeplot::Result<f64> {
    print!("Gain correction [1.0]: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    match line.trim() {
        "" => Ok(1.0),
        text => text.parse::<f64>().ok()
            .filter(|value| value.is_finite() && *value > 0.0)
            .ok_or_else(|| Error::Config(format!("gain correction {:?} must be a positive number", text))),
    }
}

fn check_status<T: Transport>(instrument: &mut Instrument<T>) -> bodeplot::Result<()> {
    let status = instrument.event_status()?;
    if status.has_errors() {
        log::warn!("{} ({}) reported {:?}", instrument.identity().model, instrument.resource(),
            status.errors());
    }
    Ok(())
}

fn main() -> bodeplot::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(gain_correction) = args.gain_correction {
        config.sweep.gain_correction = Some(gain_correction);
    }
    if let Some(path) = args.output {
        config.output.path = path;
    }
    if let Some(on_error) = args.on_error {
        config.sweep.on_error = on_error;
    }
    config.validate()?;

    let manager = SystemResourceManager::new(config.transport.clone());
    let mut scope = Scope::open(&manager, config.scope.bus, &config.scope.model)?;
    log::info!("scope: {}", scope.instrument().identity());
    let mut generator = SignalGenerator::open(&manager, config.generator.bus, &config.generator.model)?;
    log::info!("generator: {}", generator.instrument().identity());

    let gain_correction = match config.sweep.gain_correction {
        Some(gain_correction) => gain_correction,
        None => prompt_gain_correction()?,
    };

    let report = Sweep::new(&mut generator, &mut scope, &config.sweep, gain_correction).run()?;
    finish(report, &config.output.path, &mut generator, &mut scope)
}

/// Save the measured rows, then report instrument errors, then the sweep outcome.
fn finish<G: Transport, S: Transport>(report: SweepReport, path: &Path,
                                      generator: &mut SignalGenerator<G>, scope: &mut Scope<S>)
        -> bodeplot::Result<()> {
    if !report.skipped.is_empty() {
        log::warn!("{} steps skipped", report.skipped.len());
    }
    bodeplot::save_csv(path, &report.rows)?;

    // after a transport error the sessions may not answer at all
    for (name, result) in [
        ("scope", check_status(scope.instrument())),
        ("generator", check_status(generator.instrument())),
    ] {
        if let Err(error) = result {
            log::warn!("cannot read {} status: {}", name, error);
        }
    }
    report.into_result().map(|_| ())
}
