//! Test utilities: synthetic ensembles
//!
//! Frames built here are deterministic so tests and benchmarks can assert on
//! exact values without recorded instrument data.

#![cfg(any(test, feature = "benchmark"))]

use crate::ensemble::{
    AncillaryData, BeamVelocity, BottomTrack, Correlation, EarthVelocity, Ensemble, EnsembleData,
    NmeaData, Profile, RangeTracking, WavesInfo,
};
use crate::nmea::{Nmea0183Parser, checksum};

/// Serial number used by every synthetic ensemble.
pub const SAMPLE_SERIAL: &str = "01300000000000000000000000000001";

/// Interval between synthetic ensembles, in hundredths of a second.
pub const SAMPLE_INTERVAL_HSEC: i32 = 50;

/// Ensemble metadata for ensemble `number`, timestamped 0.5 s apart from
/// 2019/06/01 12:00:00.00.
pub fn sample_ensemble_data(num_beams: i32, number: i32) -> EnsembleData {
    let elapsed = number * SAMPLE_INTERVAL_HSEC;
    let seconds = elapsed / 100;
    EnsembleData {
        ensemble_number: number,
        num_bins: 30,
        num_beams,
        desired_ping_count: 1,
        actual_ping_count: 1,
        status: 0,
        year: 2019,
        month: 6,
        day: 1,
        hour: 12 + seconds / 3600,
        minute: (seconds / 60) % 60,
        second: seconds % 60,
        hsec: elapsed % 100,
        serial_number: SAMPLE_SERIAL.to_string(),
        firmware_major: 0,
        firmware_minor: 2,
        firmware_revision: 130,
        subsystem_code: if num_beams == 1 { b'A' } else { b'3' },
        subsystem_config: if num_beams == 1 { 1 } else { 0 },
    }
}

pub fn sample_ancillary() -> AncillaryData {
    AncillaryData {
        first_bin_range: 1.5,
        bin_size: 0.5,
        first_ping_time: 0.0,
        last_ping_time: 0.25,
        heading: 123.4,
        pitch: 1.2,
        roll: -0.8,
        water_temp: 15.5,
        system_temp: 18.25,
        salinity: 35.0,
        pressure: 12.3,
        transducer_depth: 12.0,
        speed_of_sound: 1500.0,
        sensor_vectors: None,
    }
}

/// Bottom track whose arrays hold distinct values per array and beam.
pub fn sample_bottom_track(beams: usize) -> BottomTrack {
    let series = |base: f32| (0..beams).map(|b| base + b as f32 * 0.25).collect::<Vec<_>>();
    BottomTrack {
        first_ping_time: 0.1,
        last_ping_time: 0.2,
        heading: 45.0,
        pitch: 0.5,
        roll: 0.25,
        water_temp: 14.0,
        system_temp: 17.5,
        salinity: 34.5,
        pressure: 11.0,
        transducer_depth: 10.5,
        speed_of_sound: 1498.0,
        status: 0.0,
        num_beams: beams as f32,
        actual_ping_count: 4.0,
        range: series(10.0),
        snr: series(20.0),
        amplitude: series(30.0),
        correlation: series(0.9),
        beam_velocity: series(-0.5),
        beam_good: series(1.0),
        instrument_velocity: series(0.2),
        instrument_good: series(1.0),
        earth_velocity: series(0.3),
        earth_good: series(1.0),
        snr_pulse_coherent: series(5.0),
        amp_pulse_coherent: series(6.0),
        vel_pulse_coherent: series(7.0),
        noise_pulse_coherent: series(8.0),
        corr_pulse_coherent: series(0.8),
    }
}

/// Short-layout range tracking with the given per-beam ranges.
pub fn sample_range_tracking(ranges: &[f32]) -> RangeTracking {
    RangeTracking {
        num_beams: ranges.len() as f32,
        snr: vec![25.0; ranges.len()],
        range: ranges.to_vec(),
        pings: vec![1.0; ranges.len()],
        ..Default::default()
    }
}

/// `$body*hh` with a correct checksum.
pub fn with_checksum(body: &str) -> String {
    format!("${}*{:02X}", body, checksum(body))
}

/// GGA at 32.865 N 117.26 W, VTG at 5.5 knots, HDT at 274.07.
pub fn sample_nmea() -> NmeaData {
    let parser = Nmea0183Parser::new();
    let mut nmea = NmeaData::default();
    for body in [
        "GPGGA,120000.00,3251.900,N,11715.600,W,1,09,0.9,2.0,M,-34.0,M,,",
        "GPVTG,054.7,T,034.4,M,005.5,N,010.2,K",
        "HEHDT,274.07,T",
    ] {
        // synthetic sentences are well formed
        let _ = nmea.add_sentence(&with_checksum(body), &parser);
    }
    nmea
}

fn sample_profile(bins: usize, beams: usize, scale: f32) -> Profile {
    let value = |bin: usize, beam: usize| scale * (bin as f32 + 1.0) + beam as f32 * 0.01;
    Profile::new((0..bins).map(|bin| (0..beams).map(|beam| value(bin, beam)).collect()).collect())
}

/// Four-beam ensemble with every dataset present.
pub fn four_beam_frame(number: i32, bins: usize) -> Ensemble {
    Ensemble {
        ensemble_data: Some(sample_ensemble_data(4, number)),
        ancillary: Some(sample_ancillary()),
        bottom_track: Some(sample_bottom_track(4)),
        beam_velocity: Some(BeamVelocity(sample_profile(bins, 4, 0.1))),
        earth_velocity: Some(EarthVelocity(sample_profile(bins, 4, 0.05))),
        correlation: Some(Correlation(Profile::new(vec![vec![0.9; 4]; bins]))),
        range_tracking: Some(sample_range_tracking(&[10.5, 10.7, 10.4, 10.6])),
        nmea: Some(sample_nmea()),
        waves_info: Some(WavesInfo {
            latitude: 32.865,
            longitude: -117.26,
            ensembles_in_burst: 2048.0,
            pressure_sensor_height: 30.0,
            wave_cell_depths: vec![3.0, 3.5, 4.0],
        }),
    }
}

/// Vertical-beam ensemble: one beam, no earth velocity or bottom track.
pub fn vertical_frame(number: i32, bins: usize) -> Ensemble {
    Ensemble {
        ensemble_data: Some(sample_ensemble_data(1, number)),
        ancillary: Some(sample_ancillary()),
        beam_velocity: Some(BeamVelocity(sample_profile(bins, 1, -0.1))),
        correlation: Some(Correlation(Profile::new(vec![vec![0.85]; bins]))),
        range_tracking: Some(sample_range_tracking(&[10.55])),
        ..Default::default()
    }
}
