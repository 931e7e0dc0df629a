//! Wave-burst aggregation and output.
//!
//! [`WaveForceCodec`] buffers decoded ensembles until a burst is complete,
//! then hands the burst to a background worker that derives the wave
//! quantities of every ensemble and writes them as one `D#####.mat` file.

pub mod burst;
pub mod codec;
pub mod record;
pub mod settings;
pub mod source;
pub mod wave_ensemble;
pub mod writer;

pub use burst::{BurstBuffer, PendingStatus};
pub use codec::{BurstEvent, IngestSummary, WaveForceCodec};
pub use record::BurstRecord;
pub use settings::{DerivationParams, HeightSource, MAX_SELECTED_BINS, WaveSettings};
pub use source::{ChannelSource, FrameSource, ReplaySource};
pub use wave_ensemble::WaveEnsemble;
pub use writer::{BurstWriter, WrittenBurst};
