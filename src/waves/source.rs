//! Frame sources for the ingest loop.

use std::collections::VecDeque;
use tokio::sync::mpsc;

use crate::Result;

/// A stream of already-demarcated ensemble frames.
///
/// Returns:
/// - `Ok(Some(bytes))` - next frame
/// - `Ok(None)` - source finished
/// - `Err(e)` - transient read failure; the caller may retry
#[async_trait::async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Frames pushed by another task, e.g. a serial framer.
#[derive(Debug)]
pub struct ChannelSource {
    receiver: mpsc::Receiver<Vec<u8>>,
}

impl ChannelSource {
    pub fn new(receiver: mpsc::Receiver<Vec<u8>>) -> Self {
        Self { receiver }
    }

    /// Bounded channel pair: push frames into the sender, hand the source to ingest.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Vec<u8>>, Self) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (tx, Self::new(rx))
    }
}

#[async_trait::async_trait]
impl FrameSource for ChannelSource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.receiver.recv().await)
    }
}

/// Recorded frames replayed from memory.
#[derive(Debug, Default, Clone)]
pub struct ReplaySource {
    frames: VecDeque<Vec<u8>>,
}

impl ReplaySource {
    pub fn new(frames: impl IntoIterator<Item = Vec<u8>>) -> Self {
        Self { frames: frames.into_iter().collect() }
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

#[async_trait::async_trait]
impl FrameSource for ReplaySource {
    async fn next_frame(&mut self) -> Result<Option<Vec<u8>>> {
        Ok(self.frames.pop_front())
    }
}
