mod sys;
mod regs;
mod config;
mod instrument;
mod generator;
mod waveform;
mod measure;
mod scope;
mod sweep;
mod report;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("no {bus} instrument identifies as {model:?}")]
    DeviceNotFound { model: String, bus: Bus },
    #[error("transport I/O error: {0}")]
    Transport(#[from] std::io::Error),
    #[error("instrument session is closed")]
    Closed,
    #[error("unexpected response to {command:?}: {response:?}")]
    InvalidResponse { command: String, response: String },
    #[error("waveform block of {len} bytes is too short to carry its framing")]
    ShortBlock { len: usize },
    #[error("waveform window {start}..={stop} decoded to {actual} samples")]
    SampleCount { start: usize, stop: usize, actual: usize },
    #[error("unknown measurement {0:?}")]
    UnknownMeasurement(String),
    #[error("{quantity} measurement failed at {frequency} Hz: {reason}")]
    Measurement { frequency: f64, quantity: String, reason: String },
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error("cannot write {}: {source}", path.display())]
    Output { path: std::path::PathBuf, #[source] source: std::io::Error },
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

pub type Result<T> =
    core::result::Result<T, Error>;

pub use sys::{
    Bus,
    Connection,
    Resource,
    Transport,
    ResourceManager,
    StreamTransport,
    SystemResourceManager,
};

pub use regs::EventStatus;

pub use config::{
    Config,
    InstrumentConfig,
    TransportConfig,
    SweepConfig,
    OutputConfig,
    ErrorPolicy,
};

pub use instrument::{
    Identity,
    Instrument,
};

pub use generator::{
    Function,
    OutputState,
    SignalGenerator,
};

pub use waveform::{
    Calibration,
    TransferWindows,
    decode_block,
    BLOCK_HEADER_LEN,
    MAX_TRANSFER_SAMPLES,
};

pub use measure::Measurement;

pub use scope::{
    MAX_MEMORY_DEPTH,
    MemoryDepth,
    Scope,
};

pub use sweep::{
    SweepRow,
    SweepReport,
    Sweep,
};

pub use report::{
    write_csv,
    save_csv,
};
