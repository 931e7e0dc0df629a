//! Tabular export of decoded ensembles.
//!
//! One row per value:
//!
//! ```text
//! timestamp,kind,subsystem_code,subsystem_config,bin,beam,blank,bin_size,value
//! 2019-06-01T12:00:00,BT_Range,3,0,0,2,1.5,0.5,10.5
//! ```
//!
//! Covers the ensemble status, bottom track and NMEA sentences.

use chrono::NaiveDateTime;
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tracing::debug;

use crate::ensemble::{BottomTrack, Ensemble};
use crate::{Result, WaveError};

/// Cell content: a number, or the raw text of an NMEA sentence.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CsvValue {
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CsvRow {
    pub timestamp: Option<NaiveDateTime>,
    pub kind: &'static str,
    pub subsystem_code: String,
    pub subsystem_config: u8,
    pub bin: usize,
    pub beam: usize,
    /// First bin position in metres.
    pub blank: f32,
    pub bin_size: f32,
    pub value: CsvValue,
}

struct RowContext {
    timestamp: Option<NaiveDateTime>,
    subsystem_code: String,
    subsystem_config: u8,
    blank: f32,
    bin_size: f32,
}

impl RowContext {
    fn row(&self, kind: &'static str, beam: usize, value: CsvValue) -> CsvRow {
        CsvRow {
            timestamp: self.timestamp,
            kind,
            subsystem_code: self.subsystem_code.clone(),
            subsystem_config: self.subsystem_config,
            bin: 0,
            beam,
            blank: self.blank,
            bin_size: self.bin_size,
            value,
        }
    }

    fn number(&self, kind: &'static str, beam: usize, value: f32) -> CsvRow {
        self.row(kind, beam, CsvValue::Number(f64::from(value)))
    }
}

impl Ensemble {
    /// Flatten the exportable datasets into rows.
    pub fn csv_rows(&self) -> Vec<CsvRow> {
        let ed = self.ensemble_data.as_ref();
        let ctx = RowContext {
            timestamp: ed.and_then(|ed| ed.datetime()),
            subsystem_code: ed
                .map(|ed| char::from(ed.subsystem_code).to_string())
                .unwrap_or_default(),
            subsystem_config: ed.map_or(0, |ed| ed.subsystem_config),
            blank: self.ancillary.as_ref().map_or(0.0, |a| a.first_bin_range),
            bin_size: self.ancillary.as_ref().map_or(0.0, |a| a.bin_size),
        };

        let mut rows = Vec::new();
        if let Some(ed) = ed {
            rows.push(ctx.row("EnsStatus", 0, CsvValue::Number(f64::from(ed.status))));
        }
        if let Some(bt) = &self.bottom_track {
            bottom_track_rows(bt, &ctx, &mut rows);
        }
        if let Some(nmea) = &self.nmea {
            for sentence in &nmea.sentences {
                rows.push(ctx.row("NMEA", 0, CsvValue::Text(sentence.clone())));
            }
        }
        rows
    }
}

fn bottom_track_rows(bt: &BottomTrack, ctx: &RowContext, rows: &mut Vec<CsvRow>) {
    rows.push(ctx.number("BT_Heading", 0, bt.heading));
    rows.push(ctx.number("BT_Pitch", 0, bt.pitch));
    rows.push(ctx.number("BT_Roll", 0, bt.roll));
    rows.push(ctx.number("BT_Pressure", 0, bt.pressure));
    rows.push(ctx.number("BT_XdcrDepth", 0, bt.transducer_depth));
    rows.push(ctx.number("BT_Status", 0, bt.status));

    let per_beam: [(&'static str, &[f32]); 7] = [
        ("BT_Range", &bt.range),
        ("BT_BeamVel", &bt.beam_velocity),
        ("BT_BeamGood", &bt.beam_good),
        ("BT_InstrVel", &bt.instrument_velocity),
        ("BT_InstrGood", &bt.instrument_good),
        ("BT_EarthVel", &bt.earth_velocity),
        ("BT_EarthGood", &bt.earth_good),
    ];
    for (kind, values) in per_beam {
        rows.extend(values.iter().enumerate().map(|(beam, &v)| ctx.number(kind, beam, v)));
    }
}

/// Write every row of `frames` as CSV, header first.
pub fn write_csv<'a, W: Write>(
    frames: impl IntoIterator<Item = &'a Ensemble>,
    out: W,
) -> Result<usize> {
    let mut writer = csv::Writer::from_writer(out);
    let mut count = 0usize;
    for frame in frames {
        for row in frame.csv_rows() {
            writer.serialize(&row).map_err(csv_error)?;
            count += 1;
        }
    }
    writer.flush()?;
    Ok(count)
}

/// [`write_csv`] into a new file at `path`.
pub fn write_csv_file<'a>(
    frames: impl IntoIterator<Item = &'a Ensemble>,
    path: impl AsRef<Path>,
) -> Result<usize> {
    let path = path.as_ref();
    let file =
        std::fs::File::create(path).map_err(|e| WaveError::file_error(path.to_path_buf(), e))?;
    let count = write_csv(frames, std::io::BufWriter::new(file)).map_err(|e| match e {
        WaveError::File { source, .. } => WaveError::file_error(path.to_path_buf(), source),
        other => other,
    })?;
    debug!("Exported {} CSV rows to {}", count, path.display());
    Ok(count)
}

fn csv_error(err: csv::Error) -> WaveError {
    WaveError::from(std::io::Error::other(err))
}
