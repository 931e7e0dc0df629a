//! Burst file output.

use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::ensemble::Ensemble;
use crate::{Result, WaveError};

use super::record::BurstRecord;
use super::settings::WaveSettings;

/// Outcome of one written burst.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenBurst {
    pub path: PathBuf,
    pub record_number: u32,
    pub four_beam_ensembles: usize,
    pub vertical_ensembles: usize,
}

/// Writes bursts as `D#####.mat` files and owns the record counter.
///
/// The counter only moves forward. When the next name is already taken it
/// advances until a free one is found, so earlier files are never replaced.
#[derive(Debug, Default)]
pub struct BurstWriter {
    next_record: u32,
}

impl BurstWriter {
    pub fn new(first_record: u32) -> Self {
        Self { next_record: first_record }
    }

    /// Record number the next burst will try first.
    pub fn next_record(&self) -> u32 {
        self.next_record
    }

    pub fn file_name(record_number: u32) -> String {
        format!("D{:05}.mat", record_number)
    }

    /// Encode `batch` and write it into `settings.output_dir`.
    pub fn write(&mut self, batch: &[Ensemble], settings: &WaveSettings) -> Result<WrittenBurst> {
        let dir = &settings.output_dir;
        std::fs::create_dir_all(dir).map_err(|e| WaveError::file_error(dir.clone(), e))?;

        let (record_number, path) = self.resolve(dir);
        let record = BurstRecord::build(batch, settings, record_number)?;
        let bytes = record.to_bytes();
        std::fs::write(&path, &bytes).map_err(|e| WaveError::file_error(path.clone(), e))?;
        self.next_record = record_number.saturating_add(1);

        info!(
            "Wrote {} ({} bytes, {} four-beam, {} vertical)",
            path.display(),
            bytes.len(),
            record.four_beam_ensembles,
            record.vertical_ensembles
        );
        Ok(WrittenBurst {
            path,
            record_number,
            four_beam_ensembles: record.four_beam_ensembles,
            vertical_ensembles: record.vertical_ensembles,
        })
    }

    fn resolve(&self, dir: &Path) -> (u32, PathBuf) {
        let mut number = self.next_record;
        loop {
            let path = dir.join(Self::file_name(number));
            if !path.exists() || number == u32::MAX {
                return (number, path);
            }
            debug!("{} exists, advancing record number", path.display());
            number += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matfile;
    use crate::test_utils::four_beam_frame;

    fn settings_in(dir: &Path) -> WaveSettings {
        WaveSettings { output_dir: dir.to_path_buf(), ..WaveSettings::default() }
    }

    #[test]
    fn existing_files_are_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        for name in ["D00000.mat", "D00001.mat", "D00002.mat"] {
            std::fs::write(tmp.path().join(name), b"old").unwrap();
        }

        let mut writer = BurstWriter::default();
        let batch: Vec<_> = (0..3).map(|i| four_beam_frame(i, 8)).collect();
        let written = writer.write(&batch, &settings_in(tmp.path())).unwrap();
        assert_eq!(written.record_number, 3);
        assert_eq!(written.path, tmp.path().join("D00003.mat"));
        assert_eq!(writer.next_record(), 4);
        assert_eq!(std::fs::read(tmp.path().join("D00000.mat")).unwrap(), b"old");

        let variables = matfile::parse_all(&std::fs::read(&written.path).unwrap()).unwrap();
        let txt = variables[0].text_value().unwrap();
        assert!(txt.contains("Record No. 3"), "{}", txt);
    }

    #[test]
    fn counter_advances_per_burst_and_creates_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let out = tmp.path().join("nested").join("bursts");
        let mut writer = BurstWriter::new(41);
        let batch = vec![four_beam_frame(0, 8)];
        let first = writer.write(&batch, &settings_in(&out)).unwrap();
        let second = writer.write(&batch, &settings_in(&out)).unwrap();
        assert_eq!(first.record_number, 41);
        assert_eq!(second.record_number, 42);
        assert!(out.join("D00042.mat").is_file());
    }

    #[test]
    fn unwritable_dir_is_a_file_error() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();
        let mut writer = BurstWriter::default();
        let err = writer.write(&[four_beam_frame(0, 4)], &settings_in(&blocker)).unwrap_err();
        assert!(matches!(err, WaveError::File { .. }));
        assert_eq!(writer.next_record(), 0);
    }
}
