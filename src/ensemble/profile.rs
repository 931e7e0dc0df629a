//! Per-bin, per-beam profile datasets.
//!
//! Beam velocity (`E000001`), earth velocity (`E000003`) and correlation
//! (`E000005`) share one layout: element count is the bin count, the multiplier
//! is the beam count, and values are stored beam-major (every bin of beam 0,
//! then every bin of beam 1, ...).

use super::Dataset;
use super::format::{DatasetHeader, FieldCursor, ValueType, push_f32};
use crate::{Result, WaveError};
use tracing::trace;

/// `values[bin][beam]` for one profile dataset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Profile {
    pub values: Vec<Vec<f32>>,
}

impl Profile {
    /// Rows with no beams carry nothing on the wire, so a profile whose every
    /// row is empty is stored as zero bins.
    pub fn new(values: Vec<Vec<f32>>) -> Self {
        if values.iter().all(Vec::is_empty) {
            return Self::default();
        }
        Self { values }
    }

    pub fn num_bins(&self) -> usize {
        self.values.len()
    }

    pub fn num_beams(&self) -> usize {
        self.values.first().map_or(0, Vec::len)
    }

    /// All beams of one bin, `None` past the last bin.
    pub fn bin(&self, bin: usize) -> Option<&[f32]> {
        self.values.get(bin).map(Vec::as_slice)
    }

    pub fn get(&self, bin: usize, beam: usize) -> Option<f32> {
        self.values.get(bin).and_then(|row| row.get(beam)).copied()
    }

    fn decode_as(data: &[u8], label: &'static str) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let beams = header.element_multiplier;
        let bins = if beams == 0 { 0 } else { header.element_count };
        let mut c = FieldCursor::new(data, &header, label);

        // declared size must fit before allocating the grid
        if data.len() < header.dataset_len() {
            return Err(WaveError::malformed(
                label,
                format!(
                    "{} bins x {} beams need {} bytes, dataset has {}",
                    bins,
                    beams,
                    header.dataset_len(),
                    data.len()
                ),
            ));
        }

        let mut values = vec![vec![0.0f32; beams]; bins];
        for beam in 0..beams {
            for row in values.iter_mut() {
                row[beam] = c.next_f32()?;
            }
        }

        trace!("{}: {} bins x {} beams", label, bins, beams);
        Ok(Self { values })
    }

    fn encode_as(&self, name: &str, label: &'static str) -> Result<Vec<u8>> {
        let beams = self.num_beams();
        let bins = if beams == 0 { 0 } else { self.num_bins() };
        if let Some(bin) = self.values.iter().position(|row| row.len() != beams) {
            return Err(WaveError::encode(
                label,
                format!("bin {} has {} beams, bin 0 has {}", bin, self.values[bin].len(), beams),
            ));
        }

        let mut out = DatasetHeader::generate(ValueType::Float, bins, beams, name);
        for beam in 0..beams {
            for row in &self.values {
                push_f32(&mut out, row[beam]);
            }
        }
        Ok(out)
    }
}

macro_rules! profile_dataset {
    ($(#[$meta:meta])* $ty:ident, $name:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        pub struct $ty(pub Profile);

        impl std::ops::Deref for $ty {
            type Target = Profile;

            fn deref(&self) -> &Profile {
                &self.0
            }
        }

        impl Dataset for $ty {
            const NAME: &'static str = $name;
            const LABEL: &'static str = stringify!($ty);

            fn decode(data: &[u8]) -> Result<Self> {
                Profile::decode_as(data, Self::LABEL).map($ty)
            }

            fn encode(&self) -> Result<Vec<u8>> {
                self.0.encode_as(Self::NAME, Self::LABEL)
            }
        }
    };
}

profile_dataset!(
    /// Velocity along each beam, m/s.
    BeamVelocity,
    "E000001\0"
);
profile_dataset!(
    /// East, north, vertical and error velocity, m/s.
    EarthVelocity,
    "E000003\0"
);
profile_dataset!(
    /// Per-beam correlation, 0.0 to 1.0.
    Correlation,
    "E000005\0"
);
