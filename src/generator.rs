//! Rigol DG1000Z series function generator.
//!
//! All commands are written without waiting for or parsing an acknowledgement. The instrument
//! silently ignores commands it cannot parse or execute; `Instrument::event_status` reports
//! such errors after the fact.

use serde::Deserialize;

use crate::{Bus, Instrument, Result};
use crate::sys::{ResourceManager, Transport};

pub const DEFAULT_MODEL: &str = "DG1032Z";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Function {
    #[default]
    #[serde(alias = "sin", alias = "sinusoid")]
    Sine,
    #[serde(alias = "squ")]
    Square,
    Ramp,
    #[serde(alias = "puls")]
    Pulse,
    #[serde(alias = "nois")]
    Noise,
    #[serde(alias = "harm")]
    Harmonic,
    Dc,
    /// The arbitrary waveform loaded with `set_arbitrary_waveform`.
    User,
}

impl Function {
    pub fn scpi_token(self) -> &'static str {
        match self {
            Self::Sine     => "SIN",
            Self::Square   => "SQU",
            Self::Ramp     => "RAMP",
            Self::Pulse    => "PULS",
            Self::Noise    => "NOIS",
            Self::Harmonic => "HARM",
            Self::Dc       => "DC",
            Self::User     => "USER",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    On,
    Off,
}

impl OutputState {
    fn scpi_token(self) -> &'static str {
        match self {
            Self::On  => "ON",
            Self::Off => "OFF",
        }
    }
}

impl From<bool> for OutputState {
    fn from(enabled: bool) -> Self {
        if enabled { Self::On } else { Self::Off }
    }
}

#[derive(Debug)]
pub struct SignalGenerator<T: Transport> {
    instrument: Instrument<T>,
}

impl<T: Transport> SignalGenerator<T> {
    pub fn open<M>(manager: &M, bus: Bus, model: &str) -> Result<SignalGenerator<T>>
            where M: ResourceManager<Transport = T> {
        Ok(SignalGenerator::new(Instrument::open(manager, bus, model)?))
    }

    pub fn new(instrument: Instrument<T>) -> SignalGenerator<T> {
        SignalGenerator { instrument }
    }

    pub fn instrument(&mut self) -> &mut Instrument<T> {
        &mut self.instrument
    }

    pub fn set_channel_function(&mut self, channel: u8, function: Function) -> Result<()> {
        log::debug!("set_channel_function({}, {:?})", channel, function);
        self.instrument.write(&format!(":SOUR{}:FUNC {}", channel, function.scpi_token()))
    }

    pub fn set_channel_frequency(&mut self, channel: u8, hz: f64) -> Result<()> {
        log::debug!("set_channel_frequency({}, {})", channel, hz);
        self.instrument.write(&format!(":SOUR{}:FREQ {}", channel, hz))
    }

    pub fn set_channel_output(&mut self, channel: u8, state: OutputState) -> Result<()> {
        log::debug!("set_channel_output({}, {:?})", channel, state);
        self.instrument.write(&format!(":OUTP{} {}", channel, state.scpi_token()))
    }

    /// Load `points` into the volatile waveform memory of `channel` and switch the channel to
    /// arbitrary function mode at `sample_rate_hz`. The output is left as it was.
    pub fn set_arbitrary_waveform(&mut self, channel: u8, sample_rate_hz: f64, points: &[f64])
            -> Result<()> {
        log::debug!("set_arbitrary_waveform({}, {}, [{} points])", channel, sample_rate_hz, points.len());
        self.instrument.write(&format!(":SOUR{}:APPL:ARB {}", channel, sample_rate_hz))?;
        let data = points.iter().map(f64::to_string).collect::<Vec<_>>();
        self.instrument.write(&format!(":SOUR{}:DATA VOLATILE,{}", channel, data.join(",")))
    }

    pub fn close(&mut self) -> Result<()> {
        self.instrument.close()
    }
}
