//! Error types for ensemble decoding and wave-burst processing.
//!
//! Every fallible operation in the crate returns [`WaveError`]. The variants
//! follow the unit of work they belong to, so callers can decide how far a
//! failure reaches:
//!
//! - **Field errors**: a read past the end of a dataset buffer
//! - **Frame errors**: a dataset that is shorter than its declared layout
//! - **Sentence errors**: a single NMEA sentence that could not be parsed
//! - **Configuration errors**: settings or height-source choices that cannot be honoured
//! - **File errors**: output directory creation or record writing failed
//! - **Encode errors**: dataset arrays that disagree on their beam count
//!
//! ## Recovery
//!
//! Nothing in the crate retries automatically. Errors tell the caller whether
//! they are confined to one unit of work (one frame, one sentence, one flush):
//!
//! ```rust
//! use adcp_waves::WaveError;
//!
//! let error = WaveError::malformed("BottomTrack", "payload ends at byte 60");
//! assert!(error.is_frame_local());
//! for suggestion in error.recovery_suggestions() {
//!     println!("  - {}", suggestion);
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for codec operations.
pub type Result<T, E = WaveError> = std::result::Result<T, E>;

/// Main error type for codec operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum WaveError {
    #[error("Read of {width} bytes at offset {offset} exceeds buffer of {len} bytes")]
    OutOfRange { offset: usize, width: usize, len: usize },

    #[error("Malformed {dataset} dataset: {details}")]
    MalformedFrame { dataset: String, details: String },

    #[error("Failed to parse NMEA sentence '{sentence}': {reason}")]
    SentenceParse { sentence: String, reason: String },

    #[error("Invalid configuration: {reason}")]
    Configuration { reason: String },

    #[error("Output file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot encode {dataset} dataset: {details}")]
    Encode { dataset: String, details: String },

    #[error("Settings could not be read: {details}")]
    Settings { details: String },
}

impl WaveError {
    /// Returns whether this error only spoils the unit of work that raised it.
    ///
    /// Frame-local errors cost one frame, one sentence or one ensemble; the
    /// caller can skip it and keep going. The rest need attention before the
    /// next burst can succeed.
    pub fn is_frame_local(&self) -> bool {
        match self {
            WaveError::OutOfRange { .. } => true,
            WaveError::MalformedFrame { .. } => true,
            WaveError::SentenceParse { .. } => true,
            WaveError::Encode { .. } => true,
            WaveError::Configuration { .. } => false,
            WaveError::File { .. } => false,
            WaveError::Settings { .. } => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            WaveError::OutOfRange { .. } => vec![
                "Check the dataset header element count",
                "Verify the frame was not truncated by the transport",
            ],
            WaveError::MalformedFrame { .. } => vec![
                "Skip the frame and continue with the next one",
                "Verify the framer delivers complete ensembles",
                "Check the instrument firmware version",
            ],
            WaveError::SentenceParse { .. } => vec![
                "Check the GPS serial link for noise",
                "Verify the sentence checksum",
            ],
            WaveError::Configuration { .. } => vec![
                "Select a height source beam that exists on the instrument",
                "Use at most three selected bins",
                "Use a burst size greater than zero",
            ],
            WaveError::File { .. } => vec![
                "Check the output directory exists and is writable",
                "Ensure sufficient disk space",
                "Check file permissions",
            ],
            WaveError::Encode { .. } => vec![
                "Keep every per-beam array the same length",
                "Re-decode the dataset before editing it",
            ],
            WaveError::Settings { .. } => vec![
                "Check the YAML syntax of the settings file",
                "Remove unknown height source names",
            ],
        }
    }

    /// Helper constructor for truncated dataset errors.
    pub fn malformed(dataset: impl Into<String>, details: impl Into<String>) -> Self {
        WaveError::MalformedFrame { dataset: dataset.into(), details: details.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn configuration(reason: impl Into<String>) -> Self {
        WaveError::Configuration { reason: reason.into() }
    }

    /// Helper constructor for file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        WaveError::File { path, source }
    }

    /// Helper constructor for NMEA sentence errors.
    pub fn sentence(sentence: impl Into<String>, reason: impl Into<String>) -> Self {
        WaveError::SentenceParse { sentence: sentence.into(), reason: reason.into() }
    }

    /// Helper constructor for encode errors.
    pub fn encode(dataset: impl Into<String>, details: impl Into<String>) -> Self {
        WaveError::Encode { dataset: dataset.into(), details: details.into() }
    }

    /// Re-labels a field read failure as a malformed dataset.
    ///
    /// Decoders read fields with the generic accessors, which only know about
    /// offsets; this attaches the dataset the read belonged to.
    pub fn in_dataset(self, dataset: &str) -> Self {
        match self {
            WaveError::OutOfRange { offset, width, len } => WaveError::MalformedFrame {
                dataset: dataset.to_string(),
                details: format!(
                    "field at offset {} needs {} bytes, dataset has {}",
                    offset, width, len
                ),
            },
            other => other,
        }
    }
}

impl From<std::io::Error> for WaveError {
    fn from(err: std::io::Error) -> Self {
        WaveError::File { path: PathBuf::from("<unknown>"), source: err }
    }
}

impl From<serde_yaml_ng::Error> for WaveError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        WaveError::Settings { details: err.to_string() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn error_messages_carry_their_context(
            dataset in "[A-Za-z]{1,16}",
            details in ".*",
            offset in 0usize..0x10000usize,
            len in 0usize..0x10000usize,
        ) {
            let malformed = WaveError::malformed(dataset.clone(), details.clone());
            let msg = malformed.to_string();
            prop_assert!(msg.contains(&dataset));
            prop_assert!(msg.contains(&details));

            let range = WaveError::OutOfRange { offset, width: 4, len };
            let msg = range.to_string();
            prop_assert!(msg.contains(&offset.to_string()));
            prop_assert!(msg.contains(&len.to_string()));
        }

        #[test]
        fn out_of_range_relabels_into_malformed(offset in 0usize..4096, len in 0usize..4096) {
            let err = WaveError::OutOfRange { offset, width: 4, len }.in_dataset("EnsembleData");
            match err {
                WaveError::MalformedFrame { dataset, details } => {
                    prop_assert_eq!(dataset, "EnsembleData");
                    prop_assert!(details.contains(&offset.to_string()));
                }
                other => prop_assert!(false, "expected MalformedFrame, got {:?}", other),
            }
        }
    }

    #[test]
    fn in_dataset_leaves_other_variants_alone() {
        let err = WaveError::configuration("no beam 3").in_dataset("BottomTrack");
        assert!(matches!(err, WaveError::Configuration { .. }));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<WaveError>();

        let error = WaveError::configuration("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn frame_local_classification() {
        assert!(WaveError::malformed("NmeaData", "short").is_frame_local());
        assert!(WaveError::sentence("$GPGGA", "bad checksum").is_frame_local());
        assert!(!WaveError::configuration("bad").is_frame_local());
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        assert!(!WaveError::file_error(PathBuf::from("/out"), io).is_frame_local());
    }

    #[test]
    fn recovery_suggestions_are_descriptive() {
        let errors = [
            WaveError::malformed("BottomTrack", "short"),
            WaveError::configuration("bad"),
            WaveError::encode("BottomTrack", "ragged"),
            WaveError::Settings { details: "bad yaml".to_string() },
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            for suggestion in suggestions {
                assert!(suggestion.len() > 5);
            }
        }
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing dir");
        match WaveError::from(io_err) {
            WaveError::File { source, .. } => assert_eq!(source.to_string(), "missing dir"),
            other => panic!("Expected File error variant, got {:?}", other),
        }

        let yaml_err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        assert!(matches!(WaveError::from(yaml_err), WaveError::Settings { .. }));
    }
}
