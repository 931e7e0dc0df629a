//! Ancillary sensor dataset (`E000009`).

use super::Dataset;
use super::format::{DatasetHeader, FieldCursor, ValueType, push_f32s};
use crate::Result;
use tracing::trace;

const BASE_ELEMENTS: usize = 13;
const EXTENDED_ELEMENTS: usize = 19;

/// Raw magnetometer and accelerometer vectors, present on newer firmware.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SensorVectors {
    pub magnetic_field: [f32; 3],
    /// Pitch, roll and vertical gravity components.
    pub gravity: [f32; 3],
}

/// Per-ensemble sensor readings and bin geometry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AncillaryData {
    pub first_bin_range: f32,
    pub bin_size: f32,
    pub first_ping_time: f32,
    pub last_ping_time: f32,
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
    pub water_temp: f32,
    pub system_temp: f32,
    pub salinity: f32,
    pub pressure: f32,
    pub transducer_depth: f32,
    pub speed_of_sound: f32,
    pub sensor_vectors: Option<SensorVectors>,
}

impl AncillaryData {
    /// Depth of the centre of `bin`, rounded to centimetres.
    pub fn bin_depth(&self, bin: usize) -> f32 {
        let depth = self.first_bin_range + bin as f32 * self.bin_size;
        (depth * 100.0).round() / 100.0
    }
}

impl Dataset for AncillaryData {
    const NAME: &'static str = "E000009\0";
    const LABEL: &'static str = "AncillaryData";

    fn decode(data: &[u8]) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let mut c = FieldCursor::new(data, &header, Self::LABEL);

        let mut anc = Self {
            first_bin_range: c.next_f32()?,
            bin_size: c.next_f32()?,
            first_ping_time: c.next_f32()?,
            last_ping_time: c.next_f32()?,
            heading: c.next_f32()?,
            pitch: c.next_f32()?,
            roll: c.next_f32()?,
            water_temp: c.next_f32()?,
            system_temp: c.next_f32()?,
            salinity: c.next_f32()?,
            pressure: c.next_f32()?,
            transducer_depth: c.next_f32()?,
            speed_of_sound: c.next_f32()?,
            sensor_vectors: None,
        };

        if header.element_count >= EXTENDED_ELEMENTS {
            let mut magnetic_field = [0.0; 3];
            for value in &mut magnetic_field {
                *value = c.next_f32()?;
            }
            let mut gravity = [0.0; 3];
            for value in &mut gravity {
                *value = c.next_f32()?;
            }
            anc.sensor_vectors = Some(SensorVectors { magnetic_field, gravity });
        }

        trace!(
            "AncillaryData: heading={} pitch={} roll={} depth={}",
            anc.heading, anc.pitch, anc.roll, anc.transducer_depth
        );
        Ok(anc)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let count =
            if self.sensor_vectors.is_some() { EXTENDED_ELEMENTS } else { BASE_ELEMENTS };
        let mut out = DatasetHeader::generate(ValueType::Float, count, 1, Self::NAME);
        push_f32s(
            &mut out,
            &[
                self.first_bin_range,
                self.bin_size,
                self.first_ping_time,
                self.last_ping_time,
                self.heading,
                self.pitch,
                self.roll,
                self.water_temp,
                self.system_temp,
                self.salinity,
                self.pressure,
                self.transducer_depth,
                self.speed_of_sound,
            ],
        );
        if let Some(vectors) = &self.sensor_vectors {
            push_f32s(&mut out, &vectors.magnetic_field);
            push_f32s(&mut out, &vectors.gravity);
        }
        Ok(out)
    }
}
