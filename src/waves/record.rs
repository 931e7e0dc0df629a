//! Burst record assembly.
//!
//! A drained batch becomes one list of MAT variables:
//!
//! | name                    | shape                  | content                       |
//! |-------------------------|------------------------|-------------------------------|
//! | `txt`                   | 1 x len (text)         | time, record number, serial   |
//! | `lat`, `lon`            | 1 x 1 (double)         | deployment position           |
//! | `wft`                   | 1 x 1 (double)         | first sample time (datenum)   |
//! | `wdt`                   | 1 x 1 (double)         | seconds between samples       |
//! | `whv`                   | 1 x bins               | selected bin depths           |
//! | `whp`                   | 1 x 1                  | pressure sensor depth         |
//! | `wus`, `wvs`, `wzs`     | ensembles x bins       | east / north / up velocity    |
//! | `wb0`..`wb3`            | ensembles x bins       | beam velocity per beam        |
//! | `wr0`..`wr3`            | ensembles x 1          | range tracking per beam       |
//! | `wps` `whg` `wph` `wrl` | ensembles x 1          | pressure, heading, pitch, roll|
//! | `wts` `whs` `wah`       | ensembles x 1          | temp, height, mean range      |
//! | `wz0`                   | vertical x bins        | vertical-beam velocity        |
//! | `wzp`, `wzr`            | vertical x 1           | vertical pressure and range   |
//!
//! Variables with no rows are left out.

use tracing::warn;

use crate::ensemble::Ensemble;
use crate::matfile::{self, MatVariable};
use crate::Result;

use super::settings::WaveSettings;
use super::wave_ensemble::WaveEnsemble;

const SECONDS_PER_DAY: f64 = 86_400.0;
const MAX_BEAMS: usize = 4;

/// Encoded variables for one burst.
#[derive(Debug, Clone, PartialEq)]
pub struct BurstRecord {
    pub record_number: u32,
    pub variables: Vec<MatVariable>,
    pub four_beam_ensembles: usize,
    pub vertical_ensembles: usize,
}

impl BurstRecord {
    /// Build the record for `batch`. Ensembles whose derivation fails are
    /// skipped with a warning.
    pub fn build(batch: &[Ensemble], settings: &WaveSettings, record_number: u32) -> Result<Self> {
        let params = settings.derivation_params();
        let mut four_beam = Vec::new();
        let mut vertical = Vec::new();
        for (index, frame) in batch.iter().enumerate() {
            match WaveEnsemble::derive(frame, &params) {
                Ok(wave) if wave.is_vertical_ens => vertical.push(wave),
                Ok(wave) => four_beam.push(wave),
                Err(e) => warn!("Skipping ensemble {} of record {}: {}", index, record_number, e),
            }
        }

        let mut variables = burst_singletons(batch, settings, record_number);
        variables.extend(four_beam_variables(&four_beam)?);
        variables.extend(vertical_variables(&vertical)?);

        Ok(Self {
            record_number,
            variables,
            four_beam_ensembles: four_beam.len(),
            vertical_ensembles: vertical.len(),
        })
    }

    pub fn get(&self, name: &str) -> Option<&MatVariable> {
        self.variables.iter().find(|v| v.name == name)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        matfile::to_bytes(&self.variables)
    }
}

fn burst_singletons(
    batch: &[Ensemble],
    settings: &WaveSettings,
    record_number: u32,
) -> Vec<MatVariable> {
    let first = batch.first();
    let first_ed = first.and_then(|f| f.ensemble_data.as_ref());
    let mut variables = Vec::new();

    let txt = match first_ed {
        Some(ed) => format!(
            "{}, Record No. {}, SN{}",
            ed.datetime_str(),
            record_number,
            ed.serial_number
        ),
        None => format!("Record No. {}", record_number),
    };
    variables.push(MatVariable::text("txt", &txt));

    let (lat, lon) = match first.and_then(|f| f.waves_info.as_ref()) {
        Some(info) => (f64::from(info.latitude), f64::from(info.longitude)),
        None => (settings.latitude, settings.longitude),
    };
    variables.push(MatVariable::scalar("lat", lat));
    variables.push(MatVariable::scalar("lon", lon));

    if let Some(ed) = first_ed {
        variables.push(MatVariable::scalar("wft", ed.matlab_datenum()));
    }
    if let Some(dt) = sample_interval(batch) {
        variables.push(MatVariable::scalar("wdt", dt));
    }

    if let Some(anc) = first.and_then(|f| f.ancillary.as_ref()) {
        let depths: Vec<f32> =
            settings.selected_bins().into_iter().map(|b| anc.bin_depth(b)).collect();
        if !depths.is_empty() {
            variables.push(MatVariable::row("whv", &depths));
        }
    }
    variables.push(MatVariable::row("whp", &[settings.pressure_sensor_depth]));
    variables
}

/// Seconds between the first sample and the next one from the same subsystem.
fn sample_interval(batch: &[Ensemble]) -> Option<f64> {
    if batch.len() < 3 {
        return None;
    }
    let first = batch[0].ensemble_data.as_ref()?;
    let next = match batch[1].ensemble_data.as_ref() {
        Some(ed) if ed.same_subsystem(first) => ed,
        _ => batch[2].ensemble_data.as_ref()?,
    };
    Some((next.matlab_datenum() - first.matlab_datenum()) * SECONDS_PER_DAY)
}

fn four_beam_variables(waves: &[WaveEnsemble]) -> Result<Vec<MatVariable>> {
    let mut variables = Vec::new();
    if waves.is_empty() {
        return Ok(variables);
    }

    let mut wus = MatrixBuilder::new("wus");
    let mut wvs = MatrixBuilder::new("wvs");
    let mut wzs = MatrixBuilder::new("wzs");
    let mut beams: Vec<MatrixBuilder> =
        (0..MAX_BEAMS).map(|k| MatrixBuilder::new(&format!("wb{}", k))).collect();
    let mut ranges: Vec<Vec<f32>> = vec![Vec::new(); MAX_BEAMS];
    for wave in waves {
        wus.push(&wave.east_vel);
        wvs.push(&wave.north_vel);
        wzs.push(&wave.vert_vel);
        for (k, builder) in beams.iter_mut().enumerate().take(wave.num_beams) {
            let row: Vec<f32> = wave.beam_vel.iter().filter_map(|b| b.get(k).copied()).collect();
            builder.push(&row);
        }
        for (k, column) in ranges.iter_mut().enumerate().take(wave.num_beams) {
            if let Some(&r) = wave.range_tracking.get(k) {
                column.push(r);
            }
        }
    }

    for builder in [wus, wvs, wzs].into_iter().chain(beams) {
        variables.extend(builder.finish()?);
    }
    for (k, column) in ranges.iter().enumerate() {
        variables.extend(column_variable(&format!("wr{}", k), column));
    }

    let column = |f: fn(&WaveEnsemble) -> f32| waves.iter().map(f).collect::<Vec<f32>>();
    variables.push(MatVariable::column("wps", &column(|w| w.pressure)));
    variables.push(MatVariable::column("whg", &column(|w| w.heading)));
    variables.push(MatVariable::column("wph", &column(|w| w.pitch)));
    variables.push(MatVariable::column("wrl", &column(|w| w.roll)));
    variables.push(MatVariable::column("wts", &column(|w| w.water_temp)));
    variables.push(MatVariable::column("whs", &column(|w| w.height)));
    variables.push(MatVariable::column("wah", &column(|w| w.avg_range_tracking)));
    Ok(variables)
}

fn vertical_variables(waves: &[WaveEnsemble]) -> Result<Vec<MatVariable>> {
    let mut variables = Vec::new();
    if waves.is_empty() {
        return Ok(variables);
    }

    let mut wz0 = MatrixBuilder::new("wz0");
    for wave in waves {
        wz0.push(&wave.vert_beam_vel);
    }
    variables.extend(wz0.finish()?);

    let pressure: Vec<f32> = waves.iter().map(|w| w.pressure).collect();
    variables.push(MatVariable::column("wzp", &pressure));
    let range: Vec<f32> = waves.iter().filter_map(|w| w.range_tracking.first().copied()).collect();
    variables.extend(column_variable("wzr", &range));
    Ok(variables)
}

fn column_variable(name: &str, values: &[f32]) -> Option<MatVariable> {
    (!values.is_empty()).then(|| MatVariable::column(name, values))
}

/// Rows of one per-bin matrix. The first non-empty row fixes the width.
struct MatrixBuilder {
    name: String,
    rows: Vec<Vec<f32>>,
}

impl MatrixBuilder {
    fn new(name: &str) -> Self {
        Self { name: name.to_string(), rows: Vec::new() }
    }

    fn push(&mut self, row: &[f32]) {
        if row.is_empty() {
            return;
        }
        if let Some(width) = self.rows.first().map(Vec::len) {
            if row.len() != width {
                warn!(
                    "Dropping {} row {} with {} bins, expected {}",
                    self.name,
                    self.rows.len(),
                    row.len(),
                    width
                );
                return;
            }
        }
        self.rows.push(row.to_vec());
    }

    fn finish(self) -> Result<Option<MatVariable>> {
        if self.rows.is_empty() {
            return Ok(None);
        }
        MatVariable::matrix(&self.name, &self.rows).map(Some)
    }
}
