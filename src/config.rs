//! Run configuration, loaded from a TOML file.
//!
//! Every field is optional; the defaults reproduce a sweep from 1 Hz to 8 kHz in 100 Hz steps
//! with a DG1032Z driving channel 1 of a DS1104Z over USB.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{Bus, Error, Function, Resource, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop at the first step that cannot be measured, keeping the rows collected so far.
    #[default]
    Abort,
    /// Record the failed step and continue with the next frequency.
    Skip,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InstrumentConfig {
    /// Model field of the `*IDN?` response, e.g. `DS1104Z`. Left empty, the default model of
    /// the instrument's role is used.
    pub model: String,
    pub bus: Bus,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    /// Network instruments, e.g. `TCPIP::192.168.1.20::5555::SOCKET`.
    pub resources: Vec<Resource>,
    /// Directory searched for `usbtmc*` device nodes.
    pub usbtmc_dir: PathBuf,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(2),
            resources: Vec::new(),
            usbtmc_dir: PathBuf::from("/dev"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SweepConfig {
    pub start_hz: f64,
    /// Exclusive.
    pub stop_hz: f64,
    pub step_hz: f64,
    /// Wait after each frequency change before measuring.
    #[serde(with = "humantime_serde")]
    pub settle: Duration,
    /// Generator channel driving the circuit.
    pub drive_channel: u8,
    /// Scope channel at the circuit input; also feeds the frequency counter.
    pub reference_channel: u8,
    /// Scope channel at the circuit output.
    pub response_channel: u8,
    pub function: Function,
    /// Gain of the response channel relative to the reference channel, e.g. to compensate for
    /// mismatched probes. Asked for interactively when absent.
    pub gain_correction: Option<f64>,
    pub on_error: ErrorPolicy,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            start_hz: 1.0,
            stop_hz: 8000.0,
            step_hz: 100.0,
            settle: Duration::from_secs(1),
            drive_channel: 1,
            reference_channel: 1,
            response_channel: 2,
            function: Function::Sine,
            gain_correction: None,
            on_error: ErrorPolicy::Abort,
        }
    }
}

impl SweepConfig {
    /// `start_hz, start_hz + step_hz, ...` up to but excluding `stop_hz`.
    pub fn frequencies(&self) -> impl Iterator<Item = f64> {
        let (start, stop, step) = (self.start_hz, self.stop_hz, self.step_hz);
        (0u64..)
            .map(move |index| start + index as f64 * step)
            .take_while(move |&frequency| step > 0.0 && frequency < stop)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |message: String| Err(Error::Config(message));
        if !(self.start_hz.is_finite() && self.start_hz > 0.0) {
            return invalid(format!("sweep start {} Hz must be positive", self.start_hz))
        }
        if !(self.stop_hz.is_finite() && self.stop_hz > self.start_hz) {
            return invalid(format!("sweep stop {} Hz must be above the start", self.stop_hz))
        }
        if !(self.step_hz.is_finite() && self.step_hz > 0.0) {
            return invalid(format!("sweep step {} Hz must be positive", self.step_hz))
        }
        if !(1..=2).contains(&self.drive_channel) {
            return invalid(format!("generator has no channel {}", self.drive_channel))
        }
        for channel in [self.reference_channel, self.response_channel] {
            if !(1..=4).contains(&channel) {
                return invalid(format!("scope has no channel {}", channel))
            }
        }
        if let Some(gain_correction) = self.gain_correction {
            if !(gain_correction.is_finite() && gain_correction > 0.0) {
                return invalid(format!("gain correction {} must be positive", gain_correction))
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub path: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("output.csv") }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub generator: InstrumentConfig,
    pub scope: InstrumentConfig,
    pub transport: TransportConfig,
    pub sweep: SweepConfig,
    pub output: OutputConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            generator: InstrumentConfig {
                model: crate::generator::DEFAULT_MODEL.to_owned(),
                bus: Bus::Usb,
            },
            scope: InstrumentConfig {
                model: crate::scope::DEFAULT_MODEL.to_owned(),
                bus: Bus::Usb,
            },
            transport: TransportConfig::default(),
            sweep: SweepConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

impl Config {
    pub fn from_toml(text: &str) -> Result<Config> {
        let mut config: Config = toml::from_str(text)
            .map_err(|error| Error::Config(error.to_string()))?;
        let defaults = Config::default();
        for (instrument, default) in [
            (&mut config.generator, defaults.generator),
            (&mut config.scope, defaults.scope),
        ] {
            if instrument.model.is_empty() {
                instrument.model = default.model;
            }
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Config> {
        log::debug!("loading configuration from {}", path.display());
        let text = std::fs::read_to_string(path)
            .map_err(|error| Error::Config(format!("{}: {}", path.display(), error)))?;
        Config::from_toml(&text).map_err(|error| match error {
            Error::Config(message) => Error::Config(format!("{}: {}", path.display(), message)),
            error => error,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.transport.timeout.is_zero() {
            return Err(Error::Config("transport timeout must not be zero".to_owned()))
        }
        self.sweep.validate()
    }
}
