//! Bottom-track dataset (`E000010`).
//!
//! Layout: 14 scalars, then ten per-beam arrays of `NumBeams` floats each, then
//! (on newer firmware) five pulse-coherent per-beam arrays. The pulse-coherent
//! block is present only when the declared element count exceeds
//! `14 + 10 * NumBeams`; older frames decode it as zero-filled arrays, so a
//! re-encode of such a frame writes explicit zeros.

use super::Dataset;
use super::format::{DatasetHeader, FieldCursor, ValueType, beam_count, push_f32, push_f32s};
use crate::{Result, WaveError};
use bitflags::bitflags;
use tracing::{debug, trace};

const SCALAR_COUNT: usize = 14;
const BASE_ARRAYS: usize = 10;
const PULSE_COHERENT_ARRAYS: usize = 5;

bitflags! {
    /// Bottom-track status word.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
    pub struct BottomTrackStatus: u32 {
        const LONG_LAG = 0x0001;
        const THREE_BEAM_SOLUTION = 0x0002;
        const HOLD = 0x0004;
        const SEARCHING = 0x0008;
        const LONG_RANGE = 0x0010;
        /// Shared with the over-temperature indication.
        const COAST = 0x0020;
        const PROOF = 0x0040;
        const LOW_GAIN = 0x0080;
        const HEADING_SENSOR_ERROR = 0x0100;
        const PRESSURE_SENSOR_ERROR = 0x0200;
        const POWER_DOWN_FAILURE = 0x0400;
        const NONVOLATILE_DATA_ERROR = 0x0800;
        const RTC_ERROR = 0x1000;
        const TEMPERATURE_ERROR = 0x2000;
        const RECEIVER_DATA_ERROR = 0x4000;
        const RECEIVER_TIMEOUT = 0x8000;
    }
}

/// Every bit set at once is how the instrument reports a low supply voltage.
const LOW_VOLTAGE: u32 = 0xFFFF;

impl BottomTrackStatus {
    /// Human-readable description of the set flags, comma separated.
    pub fn description(self) -> String {
        if self.bits() == LOW_VOLTAGE {
            return "Low Voltage".to_string();
        }

        const LABELS: [(BottomTrackStatus, &str); 16] = [
            (BottomTrackStatus::LONG_LAG, "Bottom Track Long Lag"),
            (BottomTrackStatus::THREE_BEAM_SOLUTION, "Bottom Track 3 Beam Solution"),
            (BottomTrackStatus::HOLD, "Bottom Track Search: HOLD"),
            (BottomTrackStatus::SEARCHING, "Bottom Track Search: SEARCHING"),
            (BottomTrackStatus::LONG_RANGE, "Bottom Track Long Range [Narrowband Mode]"),
            (BottomTrackStatus::COAST, "Bottom Track Coast / Over Temperature"),
            (BottomTrackStatus::PROOF, "Bottom Track Search: PROOF"),
            (BottomTrackStatus::LOW_GAIN, "Bottom Track Low Gain (Shallow Water Mode)"),
            (BottomTrackStatus::HEADING_SENSOR_ERROR, "Heading Sensor Error"),
            (BottomTrackStatus::PRESSURE_SENSOR_ERROR, "Pressure Sensor Error"),
            (BottomTrackStatus::POWER_DOWN_FAILURE, "Error Powering Down"),
            (BottomTrackStatus::NONVOLATILE_DATA_ERROR, "Error in NonVolatile Data"),
            (BottomTrackStatus::RTC_ERROR, "RTC Error"),
            (BottomTrackStatus::TEMPERATURE_ERROR, "Temperature Error"),
            (BottomTrackStatus::RECEIVER_DATA_ERROR, "Receiver Data Error"),
            (BottomTrackStatus::RECEIVER_TIMEOUT, "Receiver Timeout"),
        ];

        LABELS
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, label)| *label)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Bottom-track ping results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BottomTrack {
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
    pub status: f32,
    pub num_beams: f32,
    pub actual_ping_count: f32,
    pub range: Vec<f32>,
    pub snr: Vec<f32>,
    pub amplitude: Vec<f32>,
    pub correlation: Vec<f32>,
    pub beam_velocity: Vec<f32>,
    pub beam_good: Vec<f32>,
    pub instrument_velocity: Vec<f32>,
    pub instrument_good: Vec<f32>,
    pub earth_velocity: Vec<f32>,
    pub earth_good: Vec<f32>,
    pub snr_pulse_coherent: Vec<f32>,
    pub amp_pulse_coherent: Vec<f32>,
    pub vel_pulse_coherent: Vec<f32>,
    pub noise_pulse_coherent: Vec<f32>,
    pub corr_pulse_coherent: Vec<f32>,
}

impl BottomTrack {
    /// Zero-initialised bottom track for `beams` beams, pulse-coherent block included.
    pub fn with_beams(beams: usize) -> Self {
        let zeros = vec![0.0; beams];
        Self {
            num_beams: beams as f32,
            range: zeros.clone(),
            snr: zeros.clone(),
            amplitude: zeros.clone(),
            correlation: zeros.clone(),
            beam_velocity: zeros.clone(),
            beam_good: zeros.clone(),
            instrument_velocity: zeros.clone(),
            instrument_good: zeros.clone(),
            earth_velocity: zeros.clone(),
            earth_good: zeros.clone(),
            snr_pulse_coherent: zeros.clone(),
            amp_pulse_coherent: zeros.clone(),
            vel_pulse_coherent: zeros.clone(),
            noise_pulse_coherent: zeros.clone(),
            corr_pulse_coherent: zeros,
            ..Default::default()
        }
    }

    pub fn status_flags(&self) -> BottomTrackStatus {
        BottomTrackStatus::from_bits_retain(self.status as u32)
    }

    pub fn status_str(&self) -> String {
        self.status_flags().description()
    }

    /// Mean of the positive beam ranges, 0 when no beam has a range.
    pub fn avg_range(&self) -> f32 {
        average_range(&self.range)
    }

    fn base_arrays(&self) -> [(&'static str, &[f32]); BASE_ARRAYS] {
        [
            ("range", &self.range),
            ("snr", &self.snr),
            ("amplitude", &self.amplitude),
            ("correlation", &self.correlation),
            ("beam_velocity", &self.beam_velocity),
            ("beam_good", &self.beam_good),
            ("instrument_velocity", &self.instrument_velocity),
            ("instrument_good", &self.instrument_good),
            ("earth_velocity", &self.earth_velocity),
            ("earth_good", &self.earth_good),
        ]
    }

    fn pulse_coherent_arrays(&self) -> [(&'static str, &[f32]); PULSE_COHERENT_ARRAYS] {
        [
            ("snr_pulse_coherent", &self.snr_pulse_coherent),
            ("amp_pulse_coherent", &self.amp_pulse_coherent),
            ("vel_pulse_coherent", &self.vel_pulse_coherent),
            ("noise_pulse_coherent", &self.noise_pulse_coherent),
            ("corr_pulse_coherent", &self.corr_pulse_coherent),
        ]
    }
}

/// Mean over the strictly positive entries of `ranges`; 0 when there are none.
pub fn average_range(ranges: &[f32]) -> f32 {
    let (sum, count) = ranges
        .iter()
        .filter(|r| **r > 0.0)
        .fold((0.0f32, 0usize), |(sum, count), r| (sum + r, count + 1));
    if count > 0 { sum / count as f32 } else { 0.0 }
}

impl Dataset for BottomTrack {
    const NAME: &'static str = "E000010\0";
    const LABEL: &'static str = "BottomTrack";

    fn decode(data: &[u8]) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let mut c = FieldCursor::new(data, &header, Self::LABEL);

        let mut bt = Self {
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
            status: c.next_f32()?,
            num_beams: c.next_f32()?,
            actual_ping_count: c.next_f32()?,
            ..Default::default()
        };

        let beams = beam_count(bt.num_beams, Self::LABEL)?;
        bt.range = c.next_f32s(beams)?;
        bt.snr = c.next_f32s(beams)?;
        bt.amplitude = c.next_f32s(beams)?;
        bt.correlation = c.next_f32s(beams)?;
        bt.beam_velocity = c.next_f32s(beams)?;
        bt.beam_good = c.next_f32s(beams)?;
        bt.instrument_velocity = c.next_f32s(beams)?;
        bt.instrument_good = c.next_f32s(beams)?;
        bt.earth_velocity = c.next_f32s(beams)?;
        bt.earth_good = c.next_f32s(beams)?;

        // Scales with the beam count; equals the fixed 54 for four beams.
        if header.element_count > SCALAR_COUNT + BASE_ARRAYS * beams {
            bt.snr_pulse_coherent = c.next_f32s(beams)?;
            bt.amp_pulse_coherent = c.next_f32s(beams)?;
            bt.vel_pulse_coherent = c.next_f32s(beams)?;
            bt.noise_pulse_coherent = c.next_f32s(beams)?;
            bt.corr_pulse_coherent = c.next_f32s(beams)?;
        } else {
            trace!("BottomTrack without pulse-coherent block, zero filling {} beams", beams);
            bt.snr_pulse_coherent = vec![0.0; beams];
            bt.amp_pulse_coherent = vec![0.0; beams];
            bt.vel_pulse_coherent = vec![0.0; beams];
            bt.noise_pulse_coherent = vec![0.0; beams];
            bt.corr_pulse_coherent = vec![0.0; beams];
        }

        debug!(
            "BottomTrack: {} beams, heading={}, avg range={}, status={:#06x}",
            beams,
            bt.heading,
            bt.avg_range(),
            bt.status as u32
        );
        Ok(bt)
    }

    /// Element count is recomputed from the array lengths. All per-beam arrays
    /// must share one length; the pulse-coherent arrays may instead all be empty,
    /// which writes the short layout.
    fn encode(&self) -> Result<Vec<u8>> {
        let beams = self.range.len();
        for (name, values) in self.base_arrays() {
            if values.len() != beams {
                return Err(WaveError::encode(
                    Self::LABEL,
                    format!("{} has {} entries, range has {}", name, values.len(), beams),
                ));
            }
        }

        let pulse_coherent = self.pulse_coherent_arrays();
        let with_pulse_coherent = if pulse_coherent.iter().all(|(_, v)| v.is_empty()) {
            false
        } else {
            for (name, values) in pulse_coherent {
                if values.len() != beams {
                    return Err(WaveError::encode(
                        Self::LABEL,
                        format!("{} has {} entries, range has {}", name, values.len(), beams),
                    ));
                }
            }
            true
        };
        let arrays =
            if with_pulse_coherent { BASE_ARRAYS + PULSE_COHERENT_ARRAYS } else { BASE_ARRAYS };

        let mut out =
            DatasetHeader::generate(ValueType::Float, SCALAR_COUNT + arrays * beams, 1, Self::NAME);
        push_f32s(
            &mut out,
            &[
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
                self.status,
            ],
        );
        push_f32(&mut out, beams as f32);
        push_f32(&mut out, self.actual_ping_count);

        for (_, values) in self.base_arrays() {
            push_f32s(&mut out, values);
        }
        if with_pulse_coherent {
            for (_, values) in pulse_coherent {
                push_f32s(&mut out, values);
            }
        }
        Ok(out)
    }
}
