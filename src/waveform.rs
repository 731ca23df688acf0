//! Raw waveform transfer: windowing, block decoding and calibration into volts.

use std::ops::RangeInclusive;

use crate::{Error, Result};

/// Largest number of byte-format samples the scope returns for one `:WAV:DATA?` request.
pub const MAX_TRANSFER_SAMPLES: usize = 250_000;

/// Length of the header preceding the samples in a waveform data block.
pub const BLOCK_HEADER_LEN: usize = 12;

/// Length of the terminator following the samples in a waveform data block.
const BLOCK_TERMINATOR_LEN: usize = 1;

/// Splits the sample positions `1..=depth` (the scope counts from 1) into consecutive
/// non-empty windows of at most `window` samples.
#[derive(Debug, Clone)]
pub struct TransferWindows {
    depth: usize,
    window: usize,
    next: usize,
}

impl TransferWindows {
    pub fn new(depth: usize) -> TransferWindows {
        TransferWindows::with_window(depth, MAX_TRANSFER_SAMPLES)
    }

    pub fn with_window(depth: usize, window: usize) -> TransferWindows {
        assert!(window > 0, "transfer window must not be empty");
        TransferWindows { depth, window, next: 1 }
    }
}

impl Iterator for TransferWindows {
    type Item = RangeInclusive<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.depth {
            return None
        }
        let start = self.next;
        let stop = (start + self.window - 1).min(self.depth);
        self.next = stop + 1;
        Some(start..=stop)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.depth + 1).saturating_sub(self.next).div_ceil(self.window);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for TransferWindows {}

/// Strip the header and the terminator from a waveform data block, returning the sample codes.
pub fn decode_block(block: &[u8]) -> Result<&[u8]> {
    if block.len() < BLOCK_HEADER_LEN + BLOCK_TERMINATOR_LEN {
        return Err(Error::ShortBlock { len: block.len() })
    }
    Ok(&block[BLOCK_HEADER_LEN..block.len() - BLOCK_TERMINATOR_LEN])
}

/// Per-channel conversion from 8-bit sample codes to volts.
///
/// `volts = (code - origin - reference) * increment`, where `origin` is the vertical offset
/// relative to `reference` (the code at the vertical center of the screen) and `increment` is
/// the voltage of one code step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    pub origin: f64,
    pub reference: f64,
    pub increment: f64,
}

impl Calibration {
    pub fn code_to_volts(&self, code: u8) -> f64 {
        (code as f64 - self.origin - self.reference) * self.increment
    }

    /// Nearest code for `volts`, clamped to the 8-bit range.
    pub fn volts_to_code(&self, volts: f64) -> u8 {
        let code = volts / self.increment + self.origin + self.reference;
        code.round().clamp(u8::MIN as f64, u8::MAX as f64) as u8
    }

    pub fn apply(&self, codes: &[u8]) -> Vec<f64> {
        codes.iter().map(|&code| self.code_to_volts(code)).collect()
    }
}
