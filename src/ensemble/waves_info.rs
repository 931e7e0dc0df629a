//! Wave burst information dataset (`E000016`).

use super::Dataset;
use super::format::{DatasetHeader, FieldCursor, ValueType, push_f32, push_f32s};
use crate::Result;

const SCALAR_COUNT: usize = 4;

/// Deployment position and burst geometry recorded by the instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WavesInfo {
    pub latitude: f32,
    pub longitude: f32,
    pub ensembles_in_burst: f32,
    pub pressure_sensor_height: f32,
    /// Depth of each selected wave cell.
    pub wave_cell_depths: Vec<f32>,
}

impl Dataset for WavesInfo {
    const NAME: &'static str = "E000016\0";
    const LABEL: &'static str = "WavesInfo";

    fn decode(data: &[u8]) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let mut c = FieldCursor::new(data, &header, Self::LABEL);
        Ok(Self {
            latitude: c.next_f32()?,
            longitude: c.next_f32()?,
            ensembles_in_burst: c.next_f32()?,
            pressure_sensor_height: c.next_f32()?,
            wave_cell_depths: c.next_f32s(header.element_count.saturating_sub(SCALAR_COUNT))?,
        })
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let count = SCALAR_COUNT + self.wave_cell_depths.len();
        let mut out = DatasetHeader::generate(ValueType::Float, count, 1, Self::NAME);
        push_f32(&mut out, self.latitude);
        push_f32(&mut out, self.longitude);
        push_f32(&mut out, self.ensembles_in_burst);
        push_f32(&mut out, self.pressure_sensor_height);
        push_f32s(&mut out, &self.wave_cell_depths);
        Ok(out)
    }
}
