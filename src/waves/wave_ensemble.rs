//! Per-ensemble wave quantities.

use crate::ensemble::{BAD_VELOCITY, Correlation, Ensemble, average_range};
use crate::{Result, WaveError};

use super::settings::{DerivationParams, HeightSource};

/// Wave-relevant values pulled out of one decoded ensemble.
///
/// Per-bin vectors hold one entry per selected bin that the ensemble's
/// profiles actually cover, in selection order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WaveEnsemble {
    pub is_vertical_ens: bool,
    pub num_beams: usize,
    pub pressure: f32,
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
    pub water_temp: f32,
    pub east_vel: Vec<f32>,
    pub north_vel: Vec<f32>,
    pub vert_vel: Vec<f32>,
    /// `beam_vel[selected bin][beam]`, four-beam ensembles only.
    pub beam_vel: Vec<Vec<f32>>,
    /// Single-beam velocity per selected bin, vertical ensembles only.
    pub vert_beam_vel: Vec<f32>,
    /// Range per beam.
    pub range_tracking: Vec<f32>,
    pub height: f32,
    pub avg_range_tracking: f32,
}

impl WaveEnsemble {
    /// Derive the wave quantities of `frame`.
    ///
    /// Fails with `Configuration` when a per-beam height source names a beam
    /// the ensemble does not have.
    pub fn derive(frame: &Ensemble, params: &DerivationParams) -> Result<Self> {
        let is_vertical_ens = frame.is_vertical();
        let num_beams = match &frame.ensemble_data {
            Some(ed) => usize::try_from(ed.num_beams).unwrap_or(0),
            None => frame.beam_velocity.as_ref().map_or(0, |bv| bv.num_beams()),
        };

        let mut wave = Self { is_vertical_ens, num_beams, ..Self::default() };

        let transducer_depth = if let Some(anc) = &frame.ancillary {
            wave.heading = anc.heading;
            wave.pitch = anc.pitch;
            wave.roll = anc.roll;
            wave.water_temp = anc.water_temp;
            anc.transducer_depth
        } else if let Some(bt) = &frame.bottom_track {
            wave.heading = bt.heading;
            wave.pitch = bt.pitch;
            wave.roll = bt.roll;
            wave.water_temp = bt.water_temp;
            bt.transducer_depth
        } else {
            0.0
        };
        wave.pressure = transducer_depth + params.pressure_offset;

        wave.range_tracking = match (&frame.range_tracking, &frame.bottom_track) {
            (Some(rt), _) => rt.range.clone(),
            (None, Some(bt)) => bt.range.clone(),
            (None, None) => Vec::new(),
        };
        wave.avg_range_tracking = average_range(&wave.range_tracking);

        let threshold = params.correlation_threshold;
        let correlation = frame.correlation.as_ref();
        for &bin in &params.selected_bins {
            if let Some(row) = frame.earth_velocity.as_ref().and_then(|ev| ev.bin(bin)) {
                if row.len() >= 3 {
                    let good = bin_is_good(correlation, bin, threshold);
                    let pick = |v: f32| if good { v } else { BAD_VELOCITY };
                    wave.east_vel.push(pick(row[0]));
                    wave.north_vel.push(pick(row[1]));
                    wave.vert_vel.push(pick(row[2]));
                }
            }

            let Some(row) = frame.beam_velocity.as_ref().and_then(|bv| bv.bin(bin)) else {
                continue;
            };
            let screened: Vec<f32> = row
                .iter()
                .enumerate()
                .map(|(beam, &v)| {
                    if beam_is_good(correlation, bin, beam, threshold) { v } else { BAD_VELOCITY }
                })
                .collect();
            if is_vertical_ens {
                if let Some(&v) = screened.first() {
                    wave.vert_beam_vel.push(v);
                }
            } else {
                wave.beam_vel.push(screened);
            }
        }

        wave.height = wave.height_from(params.height_source)?;
        Ok(wave)
    }

    fn height_from(&self, source: HeightSource) -> Result<f32> {
        if source == HeightSource::Pressure {
            return Ok(self.pressure);
        }
        if self.is_vertical_ens {
            return Ok(self.range_tracking.first().copied().unwrap_or(0.0));
        }
        match source.beam() {
            None => Ok(self.avg_range_tracking),
            Some(beam) if beam >= self.num_beams => Err(WaveError::configuration(format!(
                "height source {:?} needs beam {} but the ensemble has {} beams",
                source, beam, self.num_beams
            ))),
            Some(beam) => Ok(self.range_tracking.get(beam).copied().unwrap_or(0.0)),
        }
    }
}

/// Every beam of `bin` meets the threshold. No correlation data passes.
fn bin_is_good(correlation: Option<&Correlation>, bin: usize, threshold: f32) -> bool {
    match correlation.and_then(|c| c.bin(bin)) {
        Some(row) => row.iter().all(|&c| c >= threshold),
        None => true,
    }
}

fn beam_is_good(
    correlation: Option<&Correlation>,
    bin: usize,
    beam: usize,
    threshold: f32,
) -> bool {
    correlation.and_then(|c| c.get(bin, beam)).is_none_or(|c| c >= threshold)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::Profile;
    use crate::test_utils::{four_beam_frame, vertical_frame};

    fn params(source: HeightSource) -> DerivationParams {
        DerivationParams {
            selected_bins: vec![3, 4, 5],
            height_source: source,
            correlation_threshold: 0.25,
            pressure_offset: 0.0,
        }
    }

    #[test]
    fn four_beam_selected_bins() {
        let wave = WaveEnsemble::derive(&four_beam_frame(0, 8), &params(HeightSource::default()))
            .unwrap();
        assert!(!wave.is_vertical_ens);
        assert_eq!(wave.num_beams, 4);
        assert_eq!(wave.east_vel.len(), 3);
        assert!((wave.east_vel[0] - 0.2).abs() < 1e-6);
        assert!((wave.north_vel[0] - 0.21).abs() < 1e-6);
        assert!((wave.vert_vel[2] - 0.32).abs() < 1e-6);
        assert_eq!(wave.beam_vel.len(), 3);
        assert!((wave.beam_vel[1][3] - 0.53).abs() < 1e-6);
        assert!(wave.vert_beam_vel.is_empty());
        assert!((wave.pressure - 12.0).abs() < 1e-6);
        assert!((wave.heading - 123.4).abs() < 1e-4);
        assert!((wave.avg_range_tracking - 10.55).abs() < 1e-5);
        assert!((wave.height - 10.55).abs() < 1e-5);
    }

    #[test]
    fn bins_past_the_profile_are_skipped() {
        let wave = WaveEnsemble::derive(&four_beam_frame(0, 5), &params(HeightSource::default()))
            .unwrap();
        assert_eq!(wave.east_vel.len(), 2);
        assert_eq!(wave.beam_vel.len(), 2);
    }

    #[test]
    fn vertical_ensemble_uses_its_single_beam() {
        let p = params(HeightSource::Beam3RangeTracking);
        let wave = WaveEnsemble::derive(&vertical_frame(1, 8), &p).unwrap();
        assert!(wave.is_vertical_ens);
        assert!(wave.east_vel.is_empty());
        assert!(wave.beam_vel.is_empty());
        assert_eq!(wave.vert_beam_vel.len(), 3);
        assert!((wave.vert_beam_vel[0] + 0.4).abs() < 1e-6);
        assert!((wave.height - 10.55).abs() < 1e-6);
    }

    #[test]
    fn low_correlation_marks_bad_velocity() {
        let mut frame = four_beam_frame(0, 8);
        let mut corr = vec![vec![0.9f32; 4]; 8];
        corr[4][2] = 0.1;
        frame.correlation = Some(Correlation(Profile::new(corr)));

        let wave = WaveEnsemble::derive(&frame, &params(HeightSource::default())).unwrap();
        assert_eq!(wave.east_vel[1], BAD_VELOCITY);
        assert_eq!(wave.vert_vel[1], BAD_VELOCITY);
        assert_ne!(wave.east_vel[0], BAD_VELOCITY);
        assert_eq!(wave.beam_vel[1][2], BAD_VELOCITY);
        assert_ne!(wave.beam_vel[1][1], BAD_VELOCITY);
    }

    #[test]
    fn height_sources() {
        let frame = four_beam_frame(0, 8);
        let p = params(HeightSource::Beam1RangeTracking);
        let beam1 = WaveEnsemble::derive(&frame, &p).unwrap();
        assert!((beam1.height - 10.7).abs() < 1e-6);

        let mut p = params(HeightSource::Pressure);
        p.pressure_offset = 0.5;
        let pressure = WaveEnsemble::derive(&frame, &p).unwrap();
        assert!((pressure.height - 12.5).abs() < 1e-6);
    }

    #[test]
    fn missing_beam_height_source_is_a_configuration_error() {
        let mut frame = four_beam_frame(0, 8);
        if let Some(ed) = frame.ensemble_data.as_mut() {
            ed.num_beams = 3;
        }
        let p = params(HeightSource::Beam3RangeTracking);
        let err = WaveEnsemble::derive(&frame, &p).unwrap_err();
        assert!(matches!(err, WaveError::Configuration { .. }));
    }

    #[test]
    fn bottom_track_fills_in_for_missing_datasets() {
        let mut frame = four_beam_frame(0, 8);
        frame.ancillary = None;
        frame.range_tracking = None;
        let wave = WaveEnsemble::derive(&frame, &params(HeightSource::default())).unwrap();
        assert!((wave.heading - 45.0).abs() < 1e-6);
        assert!((wave.pressure - 10.5).abs() < 1e-6);
        assert_eq!(wave.range_tracking, vec![10.0, 10.25, 10.5, 10.75]);
        assert!((wave.avg_range_tracking - 10.375).abs() < 1e-6);
    }
}
