//! Rigol DS1000Z series oscilloscope.
//!
//! The driver never reads back the acquisition state; `run`, `stop` and `single` only request
//! a transition, and repeating one is harmless.
//!
//! Several queries select instrument-wide state as a side effect: the waveform source channel
//! (`:WAV:SOUR`), the frequency counter source, and the measurement statistics, which
//! `measurement` clears for every channel.

use std::fmt;

use crate::{Bus, Calibration, Error, Instrument, Measurement, Result, TransferWindows};
use crate::sys::{ResourceManager, Transport};
use crate::waveform::decode_block;

pub const DEFAULT_MODEL: &str = "DS1104Z";

/// Deepest acquisition memory of the DS1000Z series, in samples.
pub const MAX_MEMORY_DEPTH: usize = 24_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryDepth {
    Auto,
    Points(usize),
}

impl fmt::Display for MemoryDepth {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "AUTO"),
            Self::Points(points) => write!(f, "{}", points),
        }
    }
}

#[derive(Debug)]
pub struct Scope<T: Transport> {
    instrument: Instrument<T>,
}

impl<T: Transport> Scope<T> {
    pub fn open<M>(manager: &M, bus: Bus, model: &str) -> Result<Scope<T>>
            where M: ResourceManager<Transport = T> {
        Ok(Scope::new(Instrument::open(manager, bus, model)?))
    }

    pub fn new(instrument: Instrument<T>) -> Scope<T> {
        Scope { instrument }
    }

    pub fn instrument(&mut self) -> &mut Instrument<T> {
        &mut self.instrument
    }

    pub fn query(&mut self, command: &str) -> Result<String> {
        self.instrument.query(command)
    }

    pub fn run(&mut self) -> Result<()> {
        self.instrument.write(":RUN")
    }

    pub fn stop(&mut self) -> Result<()> {
        self.instrument.write(":STOP")
    }

    pub fn single(&mut self) -> Result<()> {
        self.instrument.write(":SINGLE")
    }

    pub fn memory_depth(&mut self) -> Result<MemoryDepth> {
        const COMMAND: &str = ":ACQ:MDEP?";
        let response = self.instrument.query(COMMAND)?;
        let depth = response.trim();
        if depth.eq_ignore_ascii_case("AUTO") {
            return Ok(MemoryDepth::Auto)
        }
        // some firmware reports the depth in scientific notation
        let points = depth.parse::<usize>().ok().or_else(|| {
            depth.parse::<f64>().ok()
                .filter(|points| *points >= 0.0 && *points <= MAX_MEMORY_DEPTH as f64)
                .filter(|points| points.fract() == 0.0)
                .map(|points| points as usize)
        });
        match points {
            Some(points) if points <= MAX_MEMORY_DEPTH => Ok(MemoryDepth::Points(points)),
            _ => Err(Error::InvalidResponse { command: COMMAND.to_owned(), response }),
        }
    }

    pub fn set_memory_depth(&mut self, depth: MemoryDepth) -> Result<()> {
        self.instrument.write(&format!(":ACQ:MDEP {}", depth))
    }

    /// Sample rate of the current acquisition, in samples per second.
    pub fn sample_rate(&mut self) -> Result<f64> {
        self.instrument.query_f64(":ACQ:SRAT?")
    }

    fn select_source(&mut self, channel: u8) -> Result<()> {
        self.instrument.write(&format!(":WAV:SOUR CHAN{}", channel))
    }

    /// Stop the acquisition and read the whole acquisition memory of `channel`, in volts.
    ///
    /// The memory depth must be fixed; in `AUTO` depth the scope does not report how many
    /// samples it holds.
    pub fn acquire_channel(&mut self, channel: u8) -> Result<Vec<f64>> {
        self.stop()?;
        let depth = match self.memory_depth()? {
            MemoryDepth::Points(depth) => depth,
            MemoryDepth::Auto => return Err(Error::InvalidResponse {
                command: ":ACQ:MDEP?".to_owned(),
                response: MemoryDepth::Auto.to_string(),
            }),
        };
        self.instrument.write(":WAV:FORM BYTE")?;
        self.instrument.write(":WAV:MODE RAW")?;
        self.select_source(channel)?;

        let mut codes = Vec::with_capacity(depth);
        for window in TransferWindows::new(depth) {
            self.read_window(window, &mut codes)?;
        }

        let calibration = self.calibration(channel)?;
        log::debug!("acquire_channel({}): {} samples, {:?}", channel, codes.len(), calibration);
        Ok(calibration.apply(&codes))
    }

    fn read_window(&mut self, window: std::ops::RangeInclusive<usize>, codes: &mut Vec<u8>)
            -> Result<()> {
        let (start, stop) = window.into_inner();
        log::debug!("read_window({}..={})", start, stop);
        self.instrument.write(&format!(":WAV:STAR {}", start))?;
        self.instrument.write(&format!(":WAV:STOP {}", stop))?;
        self.instrument.write(":WAV:DATA?")?;
        let block = self.instrument.read_raw()?;
        let samples = decode_block(&block)?;
        if samples.len() != stop - start + 1 {
            return Err(Error::SampleCount { start, stop, actual: samples.len() })
        }
        codes.extend_from_slice(samples);
        Ok(())
    }

    pub fn y_origin(&mut self, channel: u8) -> Result<f64> {
        self.select_source(channel)?;
        self.instrument.query_f64(":WAV:YOR?")
    }

    pub fn y_reference(&mut self, channel: u8) -> Result<f64> {
        self.select_source(channel)?;
        self.instrument.query_f64(":WAV:YREF?")
    }

    pub fn y_increment(&mut self, channel: u8) -> Result<f64> {
        self.select_source(channel)?;
        self.instrument.query_f64(":WAV:YINC?")
    }

    pub fn calibration(&mut self, channel: u8) -> Result<Calibration> {
        Ok(Calibration {
            origin: self.y_origin(channel)?,
            reference: self.y_reference(channel)?,
            increment: self.y_increment(channel)?,
        })
    }

    /// Vertical scale of `channel`, in volts per division.
    pub fn voltage_scale(&mut self, channel: u8) -> Result<f64> {
        self.instrument.query_f64(&format!(":CHAN{}:SCAL?", channel))
    }

    pub fn voltage_offset(&mut self, channel: u8) -> Result<f64> {
        self.instrument.query_f64(&format!(":CHAN{}:OFFS?", channel))
    }

    /// Horizontal scale, in seconds per division.
    pub fn timebase(&mut self) -> Result<f64> {
        self.instrument.query_f64(":TIM:SCAL?")
    }

    pub fn time_offset(&mut self) -> Result<f64> {
        self.instrument.query_f64(":TIM:OFFS?")
    }

    /// Read one automatic measurement of `channel`, then clear the measurement statistics of
    /// all channels.
    pub fn measurement(&mut self, item: Measurement, channel: u8) -> Result<f64> {
        let value = self.instrument.query_f64(
            &format!(":MEASure:ITEM? {},CHANnel{}", item.token(), channel))?;
        self.instrument.write(":MEASure:CLEar ALL")?;
        log::debug!("measurement({}, {}) = {}", item, channel, value);
        Ok(value)
    }

    pub fn measurement_by_name(&mut self, name: &str, channel: u8) -> Result<f64> {
        self.measurement(Measurement::resolve(name)?, channel)
    }

    /// Read the hardware frequency counter after switching it to `channel`.
    pub fn frequency(&mut self, channel: u8) -> Result<f64> {
        self.instrument.write(&format!(":MEASure:COUNter:SOURce CHANnel{}", channel))?;
        let value = self.instrument.query_f64(":MEASure:COUNter:VALue?")?;
        log::debug!("frequency({}) = {}", channel, value);
        Ok(value)
    }

    pub fn close(&mut self) -> Result<()> {
        self.instrument.close()
    }
}

#[cfg(test)]
mod test {
    use std::cell::RefCell;
    use std::rc::Rc;

    use super::*;
    use crate::sys::mock::{self, Journal, MockTransport};
    use crate::MAX_TRANSFER_SAMPLES;

    #[derive(Debug, Default)]
    struct Memory {
        start: usize,
        stop: usize,
    }

    // Acquisition memory where the sample at position `n` has code `n % 256`.
    fn scope_with_depth(depth: &'static str) -> (Scope<MockTransport>, Journal) {
        let memory = Rc::new(RefCell::new(Memory::default()));
        let (instrument, journal) = MockTransport::instrument(DEFAULT_MODEL, move |command| {
            let mut memory = memory.borrow_mut();
            if let Some(start) = command.strip_prefix(":WAV:STAR ") {
                memory.start = start.parse().unwrap();
                return None
            }
            if let Some(stop) = command.strip_prefix(":WAV:STOP ") {
                memory.stop = stop.parse().unwrap();
                return None
            }
            match command {
                ":ACQ:MDEP?" => mock::line(depth),
                ":WAV:DATA?" => {
                    let payload = (memory.start..=memory.stop).map(|n| (n % 256) as u8).collect::<Vec<_>>();
                    mock::block(&payload)
                }
                ":WAV:YOR?" => mock::line("0"),
                ":WAV:YREF?" => mock::line("127"),
                ":WAV:YINC?" => mock::line("0.5"),
                _ => None,
            }
        });
        (Scope::new(instrument), journal)
    }

    #[test]
    fn test_acquire_single_window() {
        let (mut scope, journal) = scope_with_depth("12000");
        let volts = scope.acquire_channel(2).unwrap();
        assert_eq!(volts.len(), 12000);
        assert_eq!(volts[0], (1.0 - 127.0) * 0.5);
        assert_eq!(volts[126], 0.0);
        assert_eq!(journal.commands(), [
            ":STOP",
            ":ACQ:MDEP?",
            ":WAV:FORM BYTE",
            ":WAV:MODE RAW",
            ":WAV:SOUR CHAN2",
            ":WAV:STAR 1",
            ":WAV:STOP 12000",
            ":WAV:DATA?",
            ":WAV:SOUR CHAN2",
            ":WAV:YOR?",
            ":WAV:SOUR CHAN2",
            ":WAV:YREF?",
            ":WAV:SOUR CHAN2",
            ":WAV:YINC?",
        ]);
    }

    #[test]
    fn test_acquire_windows_in_order() {
        let (mut scope, journal) = scope_with_depth("600000");
        let volts = scope.acquire_channel(1).unwrap();
        assert_eq!(volts.len(), 600_000);
        assert_eq!(journal.count(":WAV:DATA?"), 3);
        for position in [1, 249_999, 250_000, 250_001, 500_001, 600_000] {
            let code = (position % 256) as f64;
            assert_eq!(volts[position - 1], (code - 127.0) * 0.5, "sample {}", position);
        }
        let bounds = journal.commands().into_iter()
            .filter(|command| command.starts_with(":WAV:STAR") || command.starts_with(":WAV:STOP"))
            .collect::<Vec<_>>();
        assert_eq!(bounds, [
            ":WAV:STAR 1", ":WAV:STOP 250000",
            ":WAV:STAR 250001", ":WAV:STOP 500000",
            ":WAV:STAR 500001", ":WAV:STOP 600000",
        ]);
    }

    #[test]
    fn test_acquire_exact_multiple_skips_empty_window() {
        let (mut scope, journal) = scope_with_depth("1e+06");
        let volts = scope.acquire_channel(1).unwrap();
        assert_eq!(volts.len(), 1_000_000);
        assert_eq!(journal.count(":WAV:DATA?"), 4);
        assert_eq!(journal.count(":WAV:DATA?"), 1_000_000 / MAX_TRANSFER_SAMPLES);
        assert_eq!(journal.count(":WAV:STAR 750001"), 1);
        assert_eq!(journal.count(":WAV:STOP 1000000"), 1);
        assert_eq!(journal.count(":WAV:STAR 1000001"), 0);
    }

    #[test]
    fn test_acquire_partial_last_window() {
        let (mut scope, journal) = scope_with_depth("1.2e+06");
        let volts = scope.acquire_channel(1).unwrap();
        assert_eq!(volts.len(), 1_200_000);
        assert_eq!(journal.count(":WAV:DATA?"), 5);
        assert_eq!(journal.count(":WAV:STAR 1000001"), 1);
        assert_eq!(journal.count(":WAV:STOP 1200000"), 1);
    }

    #[test]
    fn test_acquire_auto_depth() {
        let (mut scope, journal) = scope_with_depth("AUTO");
        assert!(matches!(scope.acquire_channel(1), Err(Error::InvalidResponse { .. })));
        assert_eq!(journal.count(":WAV:DATA?"), 0);
    }

    #[test]
    fn test_acquire_sample_count_mismatch() {
        let (instrument, _journal) = MockTransport::instrument(DEFAULT_MODEL, |command| {
            match command {
                ":ACQ:MDEP?" => mock::line("3000"),
                ":WAV:DATA?" => mock::block(&[0; 2999]),
                _ => None,
            }
        });
        let mut scope = Scope::new(instrument);
        assert!(matches!(scope.acquire_channel(1),
            Err(Error::SampleCount { start: 1, stop: 3000, actual: 2999 })));
    }

    #[test]
    fn test_memory_depth() {
        let (mut scope, journal) = scope_with_depth("24000000");
        assert_eq!(scope.memory_depth().unwrap(), MemoryDepth::Points(24_000_000));
        scope.set_memory_depth(MemoryDepth::Points(12_000)).unwrap();
        scope.set_memory_depth(MemoryDepth::Auto).unwrap();
        assert_eq!(journal.commands(), [":ACQ:MDEP?", ":ACQ:MDEP 12000", ":ACQ:MDEP AUTO"]);
    }

    #[test]
    fn test_memory_depth_garbage() {
        for depth in ["-1.5", "1.5", "NaN", "inf", "24000001", "2.4000001e+07", "1e30"] {
            let (mut scope, _journal) = scope_with_depth(depth);
            assert!(matches!(scope.memory_depth(), Err(Error::InvalidResponse { .. })), "{:?}", depth);
        }
    }

    #[test]
    fn test_acquire_implausible_depth() {
        let (mut scope, journal) = scope_with_depth("1e30");
        assert!(matches!(scope.acquire_channel(1),
            Err(Error::InvalidResponse { ref response, .. }) if response == "1e30"));
        assert_eq!(journal.count(":WAV:DATA?"), 0);
    }

    #[test]
    fn test_transitions() {
        let (mut scope, journal) = scope_with_depth("AUTO");
        scope.run().unwrap();
        scope.stop().unwrap();
        scope.stop().unwrap();
        scope.single().unwrap();
        assert_eq!(journal.commands(), [":RUN", ":STOP", ":STOP", ":SINGLE"]);
    }

    #[test]
    fn test_display_parameters() {
        let (instrument, journal) = MockTransport::instrument(DEFAULT_MODEL, |command| {
            match command {
                ":CHAN1:SCAL?" => mock::line("1.000000e+00"),
                ":CHAN1:OFFS?" => mock::line("-2.500000e-01"),
                ":TIM:SCAL?" => mock::line("5.000000e-04"),
                ":TIM:OFFS?" => mock::line("0.000000e+00"),
                ":ACQ:SRAT?" => mock::line("1.000000e+08"),
                _ => None,
            }
        });
        let mut scope = Scope::new(instrument);
        assert_eq!(scope.voltage_scale(1).unwrap(), 1.0);
        assert_eq!(scope.voltage_offset(1).unwrap(), -0.25);
        assert_eq!(scope.timebase().unwrap(), 5e-4);
        assert_eq!(scope.time_offset().unwrap(), 0.0);
        assert_eq!(scope.sample_rate().unwrap(), 1e8);
        assert_eq!(journal.count(":WAV:SOUR CHAN1"), 0);
    }

    #[test]
    fn test_measurement_clears_statistics() {
        let (instrument, journal) = MockTransport::instrument(DEFAULT_MODEL, |command| {
            match command {
                ":MEASure:ITEM? VPP,CHANnel2" => mock::line("2.040000e+00"),
                ":MEASure:ITEM? RTIMe,CHANnel1" => mock::line("1.2e-06"),
                _ => None,
            }
        });
        let mut scope = Scope::new(instrument);
        assert_eq!(scope.measurement(Measurement::Vpp, 2).unwrap(), 2.04);
        assert_eq!(scope.measurement_by_name("rise time", 1).unwrap(), 1.2e-6);
        assert_eq!(journal.commands(), [
            ":MEASure:ITEM? VPP,CHANnel2",
            ":MEASure:CLEar ALL",
            ":MEASure:ITEM? RTIMe,CHANnel1",
            ":MEASure:CLEar ALL",
        ]);
    }

    #[test]
    fn test_measurement_unknown_name_sends_nothing() {
        let (mut scope, journal) = scope_with_depth("AUTO");
        assert!(matches!(scope.measurement_by_name("phase", 1), Err(Error::UnknownMeasurement(_))));
        assert!(journal.commands().is_empty());
    }

    #[test]
    fn test_frequency_selects_counter_source() {
        let (instrument, journal) = MockTransport::instrument(DEFAULT_MODEL, |command| {
            match command {
                ":MEASure:COUNter:VALue?" => mock::line("1.000010e+03"),
                _ => None,
            }
        });
        let mut scope = Scope::new(instrument);
        assert_eq!(scope.frequency(1).unwrap(), 1000.01);
        assert_eq!(journal.commands(), [
            ":MEASure:COUNter:SOURce CHANnel1",
            ":MEASure:COUNter:VALue?",
        ]);
    }
}
