use crate::{Error, ErrorPolicy, Measurement, OutputState, Result, Scope, SignalGenerator, SweepConfig};
use crate::Transport;

/// The scope reports measurements it cannot make (e.g. no signal) as this value.
const INVALID_MEASUREMENT: f64 = 9.9e37;

/// One point of the frequency response.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepRow {
    /// Frequency counted on the reference channel, in Hz.
    pub frequency: f64,
    /// Peak-to-peak voltage on the reference channel.
    pub vpp1: f64,
    /// Peak-to-peak voltage on the response channel, gain correction applied.
    pub vpp2: f64,
    pub gain: f64,
    pub attenuation_db: f64,
}

impl SweepRow {
    pub fn compute(frequency: f64, vpp1: f64, vpp2: f64) -> Result<SweepRow> {
        let failed = |quantity: &str, reason: String| Error::Measurement {
            frequency,
            quantity: quantity.to_owned(),
            reason,
        };
        if vpp1 == 0.0 {
            return Err(failed("gain", "reference amplitude is zero".to_owned()))
        }
        let gain = vpp2 / vpp1;
        let attenuation_db = 20.0 * gain.log10();
        if !attenuation_db.is_finite() {
            return Err(failed("attenuation", format!("gain {} has no finite level in dB", gain)))
        }
        Ok(SweepRow { frequency, vpp1, vpp2, gain, attenuation_db })
    }
}

#[derive(Debug, Default)]
pub struct SweepReport {
    /// Measured points, in sweep order.
    pub rows: Vec<SweepRow>,
    /// Steps that failed and were passed over under `ErrorPolicy::Skip`.
    pub skipped: Vec<Error>,
    /// The error that ended the sweep early, if any.
    pub aborted: Option<Error>,
}

impl SweepReport {
    pub fn is_complete(&self) -> bool {
        self.aborted.is_none()
    }

    pub fn into_result(self) -> Result<Vec<SweepRow>> {
        match self.aborted {
            Some(error) => Err(error),
            None => Ok(self.rows),
        }
    }
}

/// Drives a frequency sweep with a signal generator and a scope.
///
/// The instruments are borrowed exclusively for the duration of the sweep since every step
/// relies on instrument state (selected channel, counter source) set up by the step itself.
#[derive(Debug)]
pub struct Sweep<'a, G: Transport, S: Transport> {
    generator: &'a mut SignalGenerator<G>,
    scope: &'a mut Scope<S>,
    config: &'a SweepConfig,
    gain_correction: f64,
}

impl<'a, G: Transport, S: Transport> Sweep<'a, G, S> {
    pub fn new(generator: &'a mut SignalGenerator<G>, scope: &'a mut Scope<S>,
               config: &'a SweepConfig, gain_correction: f64) -> Sweep<'a, G, S> {
        Sweep { generator, scope, config, gain_correction }
    }

    /// Enable the drive channel, measure every frequency of the sweep, and disable the drive
    /// channel again.
    ///
    /// Only failing to set up the generator is returned as an error; errors during the sweep
    /// end up in the report.
    pub fn run(&mut self) -> Result<SweepReport> {
        let channel = self.config.drive_channel;
        self.generator.set_channel_function(channel, self.config.function)?;
        self.generator.set_channel_output(channel, OutputState::On)?;
        let report = self.sweep();
        if let Err(error) = self.generator.set_channel_output(channel, OutputState::Off) {
            log::warn!("cannot disable generator channel {}: {}", channel, error);
        }
        Ok(report)
    }

    fn sweep(&mut self) -> SweepReport {
        let mut report = SweepReport::default();
        for frequency in self.config.frequencies() {
            match self.step(frequency) {
                Ok(row) => {
                    log::info!("{:>10.3} Hz: CH1 {:.4} Vpp, CH2 {:.4} Vpp, gain {:.4}, {:+.2} dB",
                        row.frequency, row.vpp1, row.vpp2, row.gain, row.attenuation_db);
                    report.rows.push(row);
                }
                Err(error @ Error::Measurement { .. }) if self.config.on_error == ErrorPolicy::Skip => {
                    log::warn!("skipping step: {}", error);
                    report.skipped.push(error);
                }
                Err(error) => {
                    log::error!("sweep aborted at {} Hz: {}", frequency, error);
                    report.aborted = Some(error);
                    break
                }
            }
        }
        report
    }

    /// Set the generator to `frequency`, wait for the circuit to settle, and measure.
    pub fn step(&mut self, frequency: f64) -> Result<SweepRow> {
        let config = self.config;
        self.generator.set_channel_frequency(config.drive_channel, frequency)?;
        std::thread::sleep(config.settle);

        let reference = config.reference_channel;
        let response = config.response_channel;
        let counted = self.read(frequency, format!("CH{} frequency", reference),
            |scope| scope.frequency(reference))?;
        let vpp1 = self.read(frequency, format!("CH{} {}", reference, Measurement::Vpp),
            |scope| scope.measurement(Measurement::Vpp, reference))?;
        let vpp2 = self.read(frequency, format!("CH{} {}", response, Measurement::Vpp),
            |scope| scope.measurement(Measurement::Vpp, response))? * self.gain_correction;

        SweepRow::compute(counted, vpp1, vpp2).map_err(|error| match error {
            // report the commanded frequency, not the counted one
            Error::Measurement { quantity, reason, .. } =>
                Error::Measurement { frequency, quantity, reason },
            error => error,
        })
    }

    fn read<F>(&mut self, frequency: f64, quantity: String, measure: F) -> Result<f64>
            where F: FnOnce(&mut Scope<S>) -> Result<f64> {
        match measure(&mut *self.scope) {
            Ok(value) if value.is_finite() && value.abs() < INVALID_MEASUREMENT =>
                Ok(value),
            Ok(value) =>
                Err(Error::Measurement { frequency, quantity, reason: format!("scope reported {}", value) }),
            Err(Error::InvalidResponse { response, .. }) =>
                Err(Error::Measurement { frequency, quantity, reason: format!("non-numeric response {:?}", response) }),
            Err(error) =>
                Err(error),
        }
    }
}
