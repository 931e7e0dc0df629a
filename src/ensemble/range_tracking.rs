//! Range tracking dataset (`E000015`).

use super::Dataset;
use super::format::{DatasetHeader, FieldCursor, ValueType, beam_count, push_f32, push_f32s};
use super::bottom_track::average_range;
use crate::{Result, WaveError};
use tracing::trace;

const BASE_ARRAYS: usize = 3;
const EXTENDED_ARRAYS: usize = 5;

/// Surface range per beam. The extended arrays are empty when the instrument
/// sent the short `1 + 3 * beams` layout.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RangeTracking {
    pub num_beams: f32,
    pub snr: Vec<f32>,
    pub range: Vec<f32>,
    pub pings: Vec<f32>,
    pub amplitude: Vec<f32>,
    pub correlation: Vec<f32>,
    pub beam_velocity: Vec<f32>,
    pub instrument_velocity: Vec<f32>,
    pub earth_velocity: Vec<f32>,
}

impl RangeTracking {
    pub fn avg_range(&self) -> f32 {
        average_range(&self.range)
    }

    fn extended(&self) -> [(&'static str, &[f32]); EXTENDED_ARRAYS] {
        [
            ("amplitude", &self.amplitude),
            ("correlation", &self.correlation),
            ("beam_velocity", &self.beam_velocity),
            ("instrument_velocity", &self.instrument_velocity),
            ("earth_velocity", &self.earth_velocity),
        ]
    }
}

impl Dataset for RangeTracking {
    const NAME: &'static str = "E000015\0";
    const LABEL: &'static str = "RangeTracking";

    fn decode(data: &[u8]) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let mut c = FieldCursor::new(data, &header, Self::LABEL);

        let num_beams = c.next_f32()?;
        let beams = beam_count(num_beams, Self::LABEL)?;
        let mut rt = Self {
            num_beams,
            snr: c.next_f32s(beams)?,
            range: c.next_f32s(beams)?,
            pings: c.next_f32s(beams)?,
            ..Default::default()
        };

        if header.element_count > 1 + BASE_ARRAYS * beams {
            rt.amplitude = c.next_f32s(beams)?;
            rt.correlation = c.next_f32s(beams)?;
            rt.beam_velocity = c.next_f32s(beams)?;
            rt.instrument_velocity = c.next_f32s(beams)?;
            rt.earth_velocity = c.next_f32s(beams)?;
        }

        trace!("RangeTracking: {} beams, ranges {:?}", beams, rt.range);
        Ok(rt)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let beams = self.range.len();
        let mismatch = |name: &str, len: usize| {
            WaveError::encode(
                Self::LABEL,
                format!("{} has {} entries, range has {}", name, len, beams),
            )
        };
        if self.snr.len() != beams {
            return Err(mismatch("snr", self.snr.len()));
        }
        if self.pings.len() != beams {
            return Err(mismatch("pings", self.pings.len()));
        }

        let extended = self.extended();
        let with_extended = extended.iter().any(|(_, v)| !v.is_empty());
        if with_extended {
            if let Some((name, values)) = extended.iter().find(|(_, v)| v.len() != beams) {
                return Err(mismatch(*name, values.len()));
            }
        }

        let arrays = if with_extended { BASE_ARRAYS + EXTENDED_ARRAYS } else { BASE_ARRAYS };
        let mut out =
            DatasetHeader::generate(ValueType::Float, 1 + arrays * beams, 1, Self::NAME);
        push_f32(&mut out, beams as f32);
        push_f32s(&mut out, &self.snr);
        push_f32s(&mut out, &self.range);
        push_f32s(&mut out, &self.pings);
        if with_extended {
            for (_, values) in extended {
                push_f32s(&mut out, values);
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sample_range_tracking;

    #[test]
    fn short_layout_round_trips() {
        let rt = sample_range_tracking(&[10.5, 10.7, 10.4, 10.6]);
        let bytes = rt.encode().unwrap();
        assert_eq!(bytes.len(), 28 + 13 * 4);
        assert_eq!(RangeTracking::decode(&bytes).unwrap(), rt);
    }

    #[test]
    fn extended_layout_round_trips() {
        let mut rt = sample_range_tracking(&[10.5, 10.7, 10.4, 10.6]);
        rt.amplitude = vec![60.0; 4];
        rt.correlation = vec![0.9; 4];
        rt.beam_velocity = vec![0.1; 4];
        rt.instrument_velocity = vec![0.2; 4];
        rt.earth_velocity = vec![0.3; 4];
        let bytes = rt.encode().unwrap();
        assert_eq!(bytes.len(), 28 + 33 * 4);
        assert_eq!(RangeTracking::decode(&bytes).unwrap(), rt);
    }

    #[test]
    fn partial_extension_is_rejected() {
        let mut rt = sample_range_tracking(&[1.0]);
        rt.amplitude = vec![60.0];
        assert!(matches!(rt.encode(), Err(WaveError::Encode { .. })));
    }

    #[test]
    fn avg_range_ignores_dropouts() {
        let rt = sample_range_tracking(&[1.2, 0.0, 3.4, 0.0]);
        assert!((rt.avg_range() - 2.3).abs() < 1e-6);
    }
}
