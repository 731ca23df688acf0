//! Sweep results as CSV, one row per frequency.

use std::fs::File;
use std::io;
use std::path::Path;

use crate::{Error, Result, SweepRow};

const HEADER: [&str; 5] = ["Frequency", "CH1 VPP", "CH2 VPP", "Gain", "Attenuation (dB)"];

fn record<'a>(fields: impl IntoIterator<Item = &'a str>) -> Vec<String> {
    // every field after the first carries a leading space
    fields.into_iter().enumerate()
        .map(|(index, field)| if index == 0 { field.to_owned() } else { format!(" {}", field) })
        .collect()
}

pub fn write_csv<W: io::Write>(writer: W, rows: &[SweepRow]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .quote_style(csv::QuoteStyle::Necessary)
        .from_writer(writer);
    writer.write_record(record(HEADER))?;
    for row in rows {
        let fields = [row.frequency, row.vpp1, row.vpp2, row.gain, row.attenuation_db]
            .map(|value| value.to_string());
        writer.write_record(record(fields.iter().map(String::as_str)))?;
    }
    writer.flush().map_err(csv::Error::from)?;
    Ok(())
}

/// Write `rows` to a new file at `path`, replacing any existing file.
pub fn save_csv(path: &Path, rows: &[SweepRow]) -> Result<()> {
    log::info!("writing {} rows to {}", rows.len(), path.display());
    let file = File::create(path)
        .map_err(|source| Error::Output { path: path.to_owned(), source })?;
    write_csv(io::BufWriter::new(file), rows)
}
