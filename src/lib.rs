//! Binary ADCP ensemble codec with wave-burst aggregation.
//!
//! Decodes the self-describing ensemble frames of a multi-beam acoustic
//! Doppler current profiler, groups them into wave bursts and writes every
//! burst as a MATLAB Level-4 `.mat` file.
//!
//! # Features
//!
//! - **Ensemble codec**: byte-exact decode and encode of every dataset in a frame
//! - **Burst aggregation**: interleaved four-beam and vertical-beam streams
//! - **MAT output**: one `D#####.mat` record per burst, written off the caller's thread
//! - **CSV export**: row-per-value export of status, bottom track and NMEA data
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use adcp_waves::{Ensemble, WaveForceCodec, WaveSettings, BurstEvent};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> adcp_waves::Result<()> {
//!     let settings = WaveSettings::from_yaml_str("ensembles_in_burst: 1024\noutput_dir: bursts")?;
//!     let codec = WaveForceCodec::new(settings)?;
//!     let mut events = Box::pin(codec.burst_events());
//!
//!     # let frames: Vec<Vec<u8>> = Vec::new();
//!     for bytes in frames {
//!         codec.add_bytes(&bytes)?;
//!     }
//!     tokio::spawn(async move {
//!         while let Some(BurstEvent::Written { path, .. }) = events.next().await {
//!             println!("wrote {}", path.display());
//!         }
//!     });
//!     codec.finish().await;
//!     Ok(())
//! }
//! ```

pub mod csv_export;
pub mod ensemble;
mod error;
pub mod matfile;
pub mod nmea;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod waves;

pub use csv_export::{CsvRow, CsvValue, write_csv, write_csv_file};
pub use ensemble::{Dataset, Ensemble};
pub use error::*;
pub use matfile::{MatType, MatVariable};
pub use nmea::{Nmea0183Parser, SentenceParser};
pub use waves::{
    BurstEvent, BurstRecord, FrameSource, HeightSource, WaveEnsemble, WaveForceCodec, WaveSettings,
};
