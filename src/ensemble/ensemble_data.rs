//! Ensemble metadata dataset (`E000008`).

use super::Dataset;
use super::format::{
    BYTES_IN_FIELD, DatasetHeader, FieldCursor, ValueType, extract_null_terminated_string,
    push_i32,
};
use crate::{Result, WaveError};
use chrono::{NaiveDate, NaiveDateTime};
use tracing::debug;

const SERIAL_LEN: usize = 32;
const ELEMENT_COUNT: usize = 23;

/// Days between the Julian Day Number epoch and the MATLAB serial date epoch.
const MATLAB_EPOCH_JDN: f64 = 1_721_059.0;
/// One second in days, added to every serial date.
const SERIAL_DATE_BIAS: f64 = 0.000011574;

/// Integer metadata describing one ensemble.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnsembleData {
    pub ensemble_number: i32,
    pub num_bins: i32,
    pub num_beams: i32,
    pub desired_ping_count: i32,
    pub actual_ping_count: i32,
    pub status: i32,
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: i32,
    pub hsec: i32,
    pub serial_number: String,
    pub firmware_major: u8,
    pub firmware_minor: u8,
    pub firmware_revision: u8,
    /// ASCII subsystem code, e.g. `b'3'`.
    pub subsystem_code: u8,
    pub subsystem_config: u8,
}

impl EnsembleData {
    /// `true` for the single vertical-beam ping of an interleaved configuration.
    pub fn is_vertical(&self) -> bool {
        self.num_beams == 1
    }

    /// `YYYY/MM/DD HH:MM:SS.hh`
    pub fn datetime_str(&self) -> String {
        format!(
            "{:04}/{:02}/{:02} {:02}:{:02}:{:02}.{:02}",
            self.year, self.month, self.day, self.hour, self.minute, self.second, self.hsec
        )
    }

    pub fn firmware_str(&self) -> String {
        format!(
            "{}.{}.{} - {}",
            self.firmware_major,
            self.firmware_minor,
            self.firmware_revision,
            char::from(self.subsystem_code)
        )
    }

    /// Timestamp as a calendar value, `None` when the fields do not form a valid date.
    pub fn datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month as u32, self.day as u32)?;
        date.and_hms_milli_opt(
            self.hour as u32,
            self.minute as u32,
            self.second as u32,
            (self.hsec as u32).saturating_mul(10),
        )
    }

    /// MATLAB serial date number (days since year 0) of the ensemble time.
    pub fn matlab_datenum(&self) -> f64 {
        let jdn = julian_day_number(self.year, self.month, self.day) as f64;
        let seconds = f64::from(self.hour) * 3600.0
            + f64::from(self.minute) * 60.0
            + f64::from(self.second)
            + f64::from(self.hsec) / 100.0;
        jdn + seconds / 86_400.0 - MATLAB_EPOCH_JDN + SERIAL_DATE_BIAS
    }

    /// Whether `other` was produced by the same subsystem configuration.
    pub fn same_subsystem(&self, other: &EnsembleData) -> bool {
        self.subsystem_code == other.subsystem_code
            && self.subsystem_config == other.subsystem_config
    }
}

/// Julian Day Number using integer arithmetic throughout.
pub fn julian_day_number(year: i32, month: i32, day: i32) -> i64 {
    let (year, month, day) = (i64::from(year), i64::from(month), i64::from(day));
    let a = (14 - month) / 12;
    let y = year + 4800 - a;
    let m = month + 12 * a - 3;
    day + (153 * m + 2) / 5 + 365 * y + y / 4 - y / 100 + y / 400 - 32045
}

impl Dataset for EnsembleData {
    const NAME: &'static str = "E000008\0";
    const LABEL: &'static str = "EnsembleData";

    fn decode(data: &[u8]) -> Result<Self> {
        let header = DatasetHeader::parse(data)?;
        let mut cursor = FieldCursor::new(data, &header, Self::LABEL);

        let ensemble_number = cursor.next_i32()?;
        let num_bins = cursor.next_i32()?;
        let num_beams = cursor.next_i32()?;
        let desired_ping_count = cursor.next_i32()?;
        let actual_ping_count = cursor.next_i32()?;
        let status = cursor.next_i32()?;
        let year = cursor.next_i32()?;
        let month = cursor.next_i32()?;
        let day = cursor.next_i32()?;
        let hour = cursor.next_i32()?;
        let minute = cursor.next_i32()?;
        let second = cursor.next_i32()?;
        let hsec = cursor.next_i32()?;
        let serial_number = extract_null_terminated_string(cursor.next_bytes(SERIAL_LEN)?);
        let firmware = cursor.next_bytes(BYTES_IN_FIELD)?;
        let config = cursor.next_bytes(BYTES_IN_FIELD)?;

        let ens = Self {
            ensemble_number,
            num_bins,
            num_beams,
            desired_ping_count,
            actual_ping_count,
            status,
            year,
            month,
            day,
            hour,
            minute,
            second,
            hsec,
            serial_number,
            firmware_revision: firmware[0],
            firmware_minor: firmware[1],
            firmware_major: firmware[2],
            subsystem_code: firmware[3],
            subsystem_config: config[3],
        };

        debug!(
            "EnsembleData #{}: {} beams x {} bins at {}, fw {}",
            ens.ensemble_number,
            ens.num_beams,
            ens.num_bins,
            ens.datetime_str(),
            ens.firmware_str()
        );
        Ok(ens)
    }

    fn encode(&self) -> Result<Vec<u8>> {
        let serial = self.serial_number.as_bytes();
        if serial.len() > SERIAL_LEN {
            return Err(WaveError::encode(
                Self::LABEL,
                format!("serial number is {} bytes, limit is {}", serial.len(), SERIAL_LEN),
            ));
        }

        let mut out = DatasetHeader::generate(ValueType::Int, ELEMENT_COUNT, 1, Self::NAME);
        for value in [
            self.ensemble_number,
            self.num_bins,
            self.num_beams,
            self.desired_ping_count,
            self.actual_ping_count,
            self.status,
            self.year,
            self.month,
            self.day,
            self.hour,
            self.minute,
            self.second,
            self.hsec,
        ] {
            push_i32(&mut out, value);
        }
        out.extend_from_slice(serial);
        out.resize(out.len() + SERIAL_LEN - serial.len(), 0);
        out.extend_from_slice(&[
            self.firmware_revision,
            self.firmware_minor,
            self.firmware_major,
            self.subsystem_code,
        ]);
        out.extend_from_slice(&[0, 0, 0, self.subsystem_config]);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ensemble::format::field_offset;
    use crate::test_utils::sample_ensemble_data;

    #[test]
    fn decode_reads_positional_fields() {
        let ens = sample_ensemble_data(4, 7);
        let bytes = ens.encode().unwrap();
        assert_eq!(bytes.len(), 28 + 23 * 4);

        assert_eq!(crate::ensemble::read_int32(field_offset(0), &bytes).unwrap(), 7);
        assert_eq!(crate::ensemble::read_int32(field_offset(2), &bytes).unwrap(), 4);
        assert_eq!(bytes[field_offset(21) + 2], ens.firmware_major);
        assert_eq!(bytes[field_offset(22) + 3], ens.subsystem_config);

        let decoded = EnsembleData::decode(&bytes).unwrap();
        assert_eq!(decoded, ens);
    }

    #[test]
    fn datetime_and_firmware_strings() {
        let ens = EnsembleData {
            year: 2013,
            month: 7,
            day: 30,
            hour: 21,
            minute: 0,
            second: 0,
            hsec: 5,
            firmware_major: 0,
            firmware_minor: 2,
            firmware_revision: 120,
            subsystem_code: b'3',
            ..Default::default()
        };
        assert_eq!(ens.datetime_str(), "2013/07/30 21:00:00.05");
        assert_eq!(ens.firmware_str(), "0.2.120 - 3");
        let dt = ens.datetime().unwrap();
        assert_eq!(dt.to_string(), "2013-07-30 21:00:00.050");
    }

    #[test]
    fn invalid_date_has_no_datetime() {
        let ens = EnsembleData { year: 2013, month: 13, day: 1, ..Default::default() };
        assert!(ens.datetime().is_none());
    }

    #[test]
    fn matlab_datenum_matches_serial_dates() {
        assert_eq!(julian_day_number(2000, 1, 1), 2_451_545);
        let ens = EnsembleData { year: 2000, month: 1, day: 1, ..Default::default() };
        assert!((ens.matlab_datenum() - (730_486.0 + SERIAL_DATE_BIAS)).abs() < 1e-9);

        let noon = EnsembleData { year: 2000, month: 1, day: 1, hour: 12, ..Default::default() };
        assert!((noon.matlab_datenum() - ens.matlab_datenum() - 0.5).abs() < 1e-9);
    }

    #[test]
    fn truncated_dataset_is_malformed() {
        let bytes = sample_ensemble_data(4, 1).encode().unwrap();
        for len in [30, 60, 28 + 13 * 4 + 10, bytes.len() - 1] {
            match EnsembleData::decode(&bytes[..len]) {
                Err(WaveError::MalformedFrame { dataset, .. }) => {
                    assert_eq!(dataset, "EnsembleData")
                }
                other => panic!("expected MalformedFrame at len {}, got {:?}", len, other),
            }
        }
    }

    #[test]
    fn oversized_serial_is_rejected() {
        let ens = EnsembleData { serial_number: "X".repeat(33), ..Default::default() };
        assert!(matches!(ens.encode(), Err(WaveError::Encode { .. })));
    }
}
