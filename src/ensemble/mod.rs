//! Binary ensemble codec.
//!
//! An ensemble frame is a concatenation of self-describing datasets. Each
//! dataset module owns one fixed positional layout and implements
//! [`Dataset`]; [`Ensemble`] walks the headers of a frame and dispatches on
//! the dataset name.

pub mod ancillary;
pub mod bottom_track;
pub mod ensemble_data;
pub mod format;
pub mod frame;
pub mod nmea_data;
pub mod profile;
pub mod range_tracking;
pub mod waves_info;

pub use ancillary::{AncillaryData, SensorVectors};
pub use bottom_track::{BottomTrack, BottomTrackStatus, average_range};
pub use ensemble_data::EnsembleData;
pub use format::{
    BAD_VELOCITY, DatasetHeader, ValueType, field_offset, header_size, read_float32, read_int32,
};
pub use frame::Ensemble;
pub use nmea_data::NmeaData;
pub use profile::{BeamVelocity, Correlation, EarthVelocity, Profile};
pub use range_tracking::RangeTracking;
pub use waves_info::WavesInfo;

use crate::Result;

/// One positional dataset layout.
pub trait Dataset: Sized {
    /// Name as written on the wire, NUL terminator included.
    const NAME: &'static str;
    /// Human-readable name used in errors and logs.
    const LABEL: &'static str;

    /// Decode from a slice starting at the dataset header. Trailing bytes are ignored.
    fn decode(data: &[u8]) -> Result<Self>;

    /// Encode header and payload, recomputing the element count.
    fn encode(&self) -> Result<Vec<u8>>;

    /// Wire name without the NUL terminator.
    fn wire_name() -> &'static str {
        Self::NAME.trim_end_matches('\0')
    }
}
