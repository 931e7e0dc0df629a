//! Wave-burst codec: accumulate ensembles, write bursts in the background.
//!
//! Frames are added on the caller's thread. When a burst completes, a private
//! copy of it is queued for a single worker task that encodes and writes one
//! burst at a time on the blocking pool. Each flush ends with a
//! [`BurstEvent`] on the broadcast channel.
//!
//! ```rust,no_run
//! use adcp_waves::waves::{WaveForceCodec, WaveSettings, ReplaySource};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn run(frames: Vec<Vec<u8>>) -> adcp_waves::Result<()> {
//! let codec = WaveForceCodec::new(WaveSettings::load("waves.yaml")?)?;
//! let summary = codec.ingest(ReplaySource::new(frames), CancellationToken::new()).await;
//! println!("{} frames, {} bursts", summary.frames, summary.flushes);
//! let leftover = codec.finish().await;
//! println!("{} frames never formed a burst", leftover);
//! # Ok(())
//! # }
//! ```

use futures::{Stream, StreamExt};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_stream::wrappers::BroadcastStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::ensemble::Ensemble;
use crate::nmea::{Nmea0183Parser, SentenceParser};
use crate::{Result, WaveError};

use super::burst::{BurstBuffer, PendingStatus};
use super::settings::WaveSettings;
use super::source::FrameSource;
use super::writer::{BurstWriter, WrittenBurst};

const EVENT_CAPACITY: usize = 64;
const MAX_SOURCE_ERRORS: u32 = 10;

/// Completion notice for one flushed burst.
#[derive(Debug, Clone)]
pub enum BurstEvent {
    Written {
        path: PathBuf,
        record_number: u32,
        four_beam_ensembles: usize,
        vertical_ensembles: usize,
    },
    /// The burst was lost.
    Failed { error: Arc<WaveError> },
}

impl From<WrittenBurst> for BurstEvent {
    fn from(written: WrittenBurst) -> Self {
        BurstEvent::Written {
            path: written.path,
            record_number: written.record_number,
            four_beam_ensembles: written.four_beam_ensembles,
            vertical_ensembles: written.vertical_ensembles,
        }
    }
}

/// Counts from one [`WaveForceCodec::ingest`] run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct IngestSummary {
    pub frames: u64,
    /// Frames that failed to decode.
    pub skipped: u64,
    pub flushes: u64,
}

struct BurstJob {
    batch: Vec<Ensemble>,
    settings: WaveSettings,
}

struct Shared {
    buffer: BurstBuffer,
    settings: WaveSettings,
}

/// Ensemble-to-burst codec.
///
/// Must be created inside a Tokio runtime; the worker is spawned on it and
/// construction fails with `Configuration` anywhere else.
pub struct WaveForceCodec {
    shared: Arc<Mutex<Shared>>,
    jobs: Option<mpsc::UnboundedSender<BurstJob>>,
    events: broadcast::Sender<BurstEvent>,
    worker: Option<JoinHandle<()>>,
    parser: Arc<dyn SentenceParser>,
}

impl WaveForceCodec {
    pub fn new(settings: WaveSettings) -> Result<Self> {
        Self::with_parser(settings, Arc::new(Nmea0183Parser::new()))
    }

    /// Codec decoding NMEA sentences with `parser`.
    ///
    /// The burst worker is spawned on the current Tokio runtime; outside one
    /// this fails with `Configuration`.
    pub fn with_parser(settings: WaveSettings, parser: Arc<dyn SentenceParser>) -> Result<Self> {
        settings.validate()?;
        let runtime = tokio::runtime::Handle::try_current().map_err(|e| {
            WaveError::configuration(format!("codec needs a Tokio runtime: {}", e))
        })?;
        let (jobs, job_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let worker_events = events.clone();
        let worker = runtime.spawn(async move {
            Self::burst_worker(job_rx, worker_events, BurstWriter::default()).await;
        });

        let shared = Shared { buffer: BurstBuffer::new(settings.ensembles_in_burst), settings };
        Ok(Self {
            shared: Arc::new(Mutex::new(shared)),
            jobs: Some(jobs),
            events,
            worker: Some(worker),
            parser,
        })
    }

    /// Add a decoded ensemble. Returns `true` when it completed a burst.
    pub fn add(&self, frame: Ensemble) -> bool {
        let job = {
            let mut shared = self.lock();
            match shared.buffer.push(frame) {
                Some(batch) => BurstJob { batch, settings: shared.settings.clone() },
                None => return false,
            }
        };

        debug!("Queueing burst of {} ensembles", job.batch.len());
        if let Some(jobs) = &self.jobs {
            if jobs.send(job).is_err() {
                warn!("Burst worker has stopped, burst dropped");
            }
        }
        true
    }

    /// Decode a frame and add it.
    pub fn add_bytes(&self, data: &[u8]) -> Result<bool> {
        let frame = Ensemble::decode_with(data, self.parser.as_ref())?;
        Ok(self.add(frame))
    }

    /// Replace the settings. The buffered frames and counters are kept.
    pub fn reconfigure(&self, settings: WaveSettings) -> Result<()> {
        settings.validate()?;
        let mut shared = self.lock();
        shared.buffer.set_burst_size(settings.ensembles_in_burst);
        info!(
            "Reconfigured: {} ensembles per burst into {}",
            settings.ensembles_in_burst,
            settings.output_dir.display()
        );
        shared.settings = settings;
        Ok(())
    }

    pub fn settings(&self) -> WaveSettings {
        self.lock().settings.clone()
    }

    pub fn pending(&self) -> PendingStatus {
        self.lock().buffer.pending()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BurstEvent> {
        self.events.subscribe()
    }

    /// Burst events from now on. Events missed by a slow consumer are dropped.
    pub fn burst_events(&self) -> impl Stream<Item = BurstEvent> + Send + 'static {
        BroadcastStream::new(self.events.subscribe()).filter_map(|event| async move { event.ok() })
    }

    /// Pump frames from `source` until it ends or `cancel` fires.
    ///
    /// Frames that fail to decode are skipped. Source errors back off
    /// exponentially and stop the run after ten in a row.
    pub async fn ingest<S: FrameSource>(
        &self,
        mut source: S,
        cancel: CancellationToken,
    ) -> IngestSummary {
        info!("Ingest started");
        let mut summary = IngestSummary::default();
        let mut error_count = 0u32;

        loop {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Ingest cancelled");
                    break;
                }
                result = source.next_frame() => result,
            };

            match result {
                Ok(Some(bytes)) => {
                    summary.frames += 1;
                    error_count = 0;
                    match self.add_bytes(&bytes) {
                        Ok(true) => summary.flushes += 1,
                        Ok(false) => {}
                        Err(e) => {
                            summary.skipped += 1;
                            debug!(
                                "Skipping frame {} ({} bytes): {}",
                                summary.frames,
                                bytes.len(),
                                e
                            );
                        }
                    }
                    trace!("Frame {} ingested", summary.frames);
                }
                Ok(None) => {
                    info!("Frame source ended after {} frames", summary.frames);
                    break;
                }
                Err(e) => {
                    error_count += 1;
                    error!("Frame source error ({}/{}): {}", error_count, MAX_SOURCE_ERRORS, e);
                    if error_count >= MAX_SOURCE_ERRORS {
                        error!("Too many frame source errors, stopping ingest");
                        break;
                    }
                    // 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << (error_count - 1).min(5)));
                    tokio::time::sleep(backoff).await;
                }
            }
        }

        info!(
            "Ingest ended ({} frames, {} skipped, {} bursts)",
            summary.frames, summary.skipped, summary.flushes
        );
        summary
    }

    /// Close the job queue and wait for queued bursts to be written.
    ///
    /// Returns the number of buffered frames that never formed a burst.
    pub async fn finish(mut self) -> usize {
        drop(self.jobs.take());
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                error!("Burst worker ended abnormally: {}", e);
            }
        }
        self.pending().buffered
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    async fn burst_worker(
        mut jobs: mpsc::UnboundedReceiver<BurstJob>,
        events: broadcast::Sender<BurstEvent>,
        mut writer: BurstWriter,
    ) {
        info!("Burst worker started");
        while let Some(job) = jobs.recv().await {
            let result = tokio::task::spawn_blocking(move || {
                let outcome = writer.write(&job.batch, &job.settings);
                (writer, outcome)
            })
            .await;

            let event = match result {
                Ok((returned, outcome)) => {
                    writer = returned;
                    match outcome {
                        Ok(written) => BurstEvent::from(written),
                        Err(e) => {
                            error!("Burst lost: {}", e);
                            BurstEvent::Failed { error: Arc::new(e) }
                        }
                    }
                }
                Err(e) => {
                    error!("Burst write task failed, worker stopping: {}", e);
                    break;
                }
            };
            // no subscribers is fine
            let _ = events.send(event);
        }
        info!("Burst worker ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{four_beam_frame, vertical_frame};
    use crate::waves::ReplaySource;

    fn settings(dir: &tempfile::TempDir, burst: usize) -> WaveSettings {
        WaveSettings {
            ensembles_in_burst: burst,
            output_dir: dir.path().to_path_buf(),
            ..WaveSettings::default()
        }
    }

    #[tokio::test]
    async fn flush_writes_a_file_and_reports_it() {
        let _ = tracing_subscriber::fmt::try_init();
        let tmp = tempfile::tempdir().unwrap();
        let codec = WaveForceCodec::new(settings(&tmp, 4)).unwrap();
        let mut events = codec.subscribe();

        let flushed: Vec<bool> = (0..5).map(|i| codec.add(four_beam_frame(i, 8))).collect();
        assert_eq!(flushed, vec![false, false, false, true, false]);

        match events.recv().await.unwrap() {
            BurstEvent::Written { path, record_number, four_beam_ensembles, .. } => {
                assert_eq!(record_number, 0);
                assert_eq!(path, tmp.path().join("D00000.mat"));
                assert_eq!(four_beam_ensembles, 4);
                assert!(path.is_file());
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert_eq!(codec.finish().await, 1);
    }

    #[tokio::test]
    async fn reconfigure_keeps_buffer() {
        let tmp = tempfile::tempdir().unwrap();
        let codec = WaveForceCodec::new(settings(&tmp, 100)).unwrap();
        for i in 0..3 {
            assert!(!codec.add(vertical_frame(i, 8)));
        }
        codec.reconfigure(settings(&tmp, 3)).unwrap();
        assert_eq!(codec.pending().buffered, 3);
        assert!(codec.add(vertical_frame(3, 8)));

        let bad = WaveSettings { ensembles_in_burst: 0, ..settings(&tmp, 3) };
        assert!(matches!(codec.reconfigure(bad), Err(WaveError::Configuration { .. })));
        assert_eq!(codec.settings().ensembles_in_burst, 3);
        assert_eq!(codec.finish().await, 1);
    }

    #[tokio::test]
    async fn ingest_skips_malformed_frames() {
        let tmp = tempfile::tempdir().unwrap();
        let codec = WaveForceCodec::new(settings(&tmp, 2)).unwrap();
        let mut events = Box::pin(codec.burst_events());

        let good = four_beam_frame(0, 8).encode().unwrap();
        let truncated = good[..good.len() - 7].to_vec();
        let source = ReplaySource::new(vec![good.clone(), truncated, good]);
        let summary = codec.ingest(source, CancellationToken::new()).await;
        assert_eq!(summary, IngestSummary { frames: 3, skipped: 1, flushes: 1 });

        assert!(matches!(events.next().await, Some(BurstEvent::Written { record_number: 0, .. })));
        assert_eq!(codec.finish().await, 0);
    }

    #[tokio::test]
    async fn failed_write_is_reported() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        std::fs::write(&blocker, b"").unwrap();
        let settings =
            WaveSettings { ensembles_in_burst: 1, output_dir: blocker, ..Default::default() };
        let codec = WaveForceCodec::new(settings).unwrap();
        let mut events = codec.subscribe();
        assert!(codec.add(four_beam_frame(0, 4)));
        match events.recv().await.unwrap() {
            BurstEvent::Failed { error } => assert!(matches!(*error, WaveError::File { .. })),
            other => panic!("unexpected event {:?}", other),
        }
        codec.finish().await;
    }

    #[test]
    fn construction_outside_runtime_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let result = WaveForceCodec::new(settings(&tmp, 4));
        assert!(matches!(result, Err(WaveError::Configuration { .. })));
    }

    #[tokio::test]
    async fn cancelled_ingest_stops() {
        let tmp = tempfile::tempdir().unwrap();
        let codec = WaveForceCodec::new(settings(&tmp, 4)).unwrap();
        let (_tx, source) = crate::waves::ChannelSource::channel(1);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = codec.ingest(source, cancel).await;
        assert_eq!(summary, IngestSummary::default());
        codec.finish().await;
    }
}
