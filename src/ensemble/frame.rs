//! Whole-frame decode and encode.

use super::format::{BASE_HEADER_SIZE, DatasetHeader, ValueType, read_int32};
use super::{
    AncillaryData, BeamVelocity, BottomTrack, Correlation, Dataset, EarthVelocity, EnsembleData,
    NmeaData, RangeTracking, WavesInfo,
};
use crate::nmea::{Nmea0183Parser, SentenceParser};
use crate::{Result, WaveError};
use tracing::{debug, trace};

/// One ensemble: every dataset the frame carried, by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Ensemble {
    pub ensemble_data: Option<EnsembleData>,
    pub ancillary: Option<AncillaryData>,
    pub bottom_track: Option<BottomTrack>,
    pub beam_velocity: Option<BeamVelocity>,
    pub earth_velocity: Option<EarthVelocity>,
    pub correlation: Option<Correlation>,
    pub range_tracking: Option<RangeTracking>,
    pub nmea: Option<NmeaData>,
    pub waves_info: Option<WavesInfo>,
}

impl Ensemble {
    /// Decode a complete frame using the bundled NMEA parser.
    pub fn decode(data: &[u8]) -> Result<Self> {
        Self::decode_with(data, &Nmea0183Parser::new())
    }

    /// Decode a complete frame.
    ///
    /// Datasets are read back to back until fewer than a header's worth of bytes
    /// remain or the next word is not a known value type (frame checksum or
    /// padding). Unknown dataset names are skipped. A dataset whose declared size
    /// runs past the buffer fails the whole frame with `MalformedFrame`.
    pub fn decode_with(data: &[u8], parser: &dyn SentenceParser) -> Result<Self> {
        let mut frame = Self::default();
        let mut offset = 0usize;

        while data.len() - offset >= BASE_HEADER_SIZE {
            let rest = &data[offset..];
            let tag = read_int32(0, rest)?;
            if ValueType::from_tag(tag).is_none() {
                trace!("Stopping at offset {}: {} trailing bytes", offset, rest.len());
                break;
            }

            let header = DatasetHeader::parse(rest)?;
            let len = header.dataset_len();
            let dataset = rest.get(..len).ok_or_else(|| {
                WaveError::malformed(
                    header.name.clone(),
                    format!(
                        "declares {} bytes at offset {}, frame has {}",
                        len,
                        offset,
                        rest.len()
                    ),
                )
            })?;

            match header.name.as_str() {
                n if n == EnsembleData::wire_name() => {
                    frame.ensemble_data = Some(EnsembleData::decode(dataset)?)
                }
                n if n == AncillaryData::wire_name() => {
                    frame.ancillary = Some(AncillaryData::decode(dataset)?)
                }
                n if n == BottomTrack::wire_name() => {
                    frame.bottom_track = Some(BottomTrack::decode(dataset)?)
                }
                n if n == BeamVelocity::wire_name() => {
                    frame.beam_velocity = Some(BeamVelocity::decode(dataset)?)
                }
                n if n == EarthVelocity::wire_name() => {
                    frame.earth_velocity = Some(EarthVelocity::decode(dataset)?)
                }
                n if n == Correlation::wire_name() => {
                    frame.correlation = Some(Correlation::decode(dataset)?)
                }
                n if n == RangeTracking::wire_name() => {
                    frame.range_tracking = Some(RangeTracking::decode(dataset)?)
                }
                n if n == NmeaData::wire_name() => {
                    frame.nmea = Some(NmeaData::decode_with(dataset, parser)?)
                }
                n if n == WavesInfo::wire_name() => {
                    frame.waves_info = Some(WavesInfo::decode(dataset)?)
                }
                other => debug!("Skipping unknown dataset {} ({} bytes)", other, len),
            }

            offset += len;
        }

        Ok(frame)
    }

    /// Concatenate every present dataset.
    pub fn encode(&self) -> Result<Vec<u8>> {
        fn append<D: Dataset>(out: &mut Vec<u8>, dataset: &Option<D>) -> Result<()> {
            if let Some(dataset) = dataset {
                out.extend_from_slice(&dataset.encode()?);
            }
            Ok(())
        }

        let mut out = Vec::new();
        append(&mut out, &self.beam_velocity)?;
        append(&mut out, &self.earth_velocity)?;
        append(&mut out, &self.correlation)?;
        append(&mut out, &self.ensemble_data)?;
        append(&mut out, &self.ancillary)?;
        append(&mut out, &self.bottom_track)?;
        append(&mut out, &self.nmea)?;
        append(&mut out, &self.range_tracking)?;
        append(&mut out, &self.waves_info)?;
        Ok(out)
    }

    /// `true` when the ensemble metadata reports a single (vertical) beam.
    pub fn is_vertical(&self) -> bool {
        self.ensemble_data.as_ref().is_some_and(EnsembleData::is_vertical)
    }
}
