//! Video sources.
//!
//! A `VideoSource` yields decoded frames until exhaustion; a `Playlist`
//! cycles a list of sources forever, advancing to the next entry whenever
//! the current one runs out. Real decoders (files, cameras) live outside
//! the kernel; the built-in synthetic source covers tests and the demo
//! daemon.

mod synthetic;

pub use synthetic::{SyntheticConfig, SyntheticSource};

use anyhow::{anyhow, Result};

use crate::frame::Frame;

/// A sequential frame producer. Read only from the dispatch driver, never
/// concurrently.
pub trait VideoSource: Send {
    /// Human-readable identifier for logs.
    fn name(&self) -> &str;

    /// Next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Frame>>;

    /// Rewind to the beginning, for playlist looping.
    fn reset(&mut self) -> Result<()>;
}

/// What one playlist read produced.
#[derive(Debug)]
pub enum PlaylistRead {
    /// A decoded frame from the current source.
    Frame(Frame),
    /// The current source was exhausted; the playlist advanced. No frame
    /// was produced for this read.
    Advanced { from: String, to: String },
}

/// An ordered set of sources, cycling indefinitely.
pub struct Playlist {
    sources: Vec<Box<dyn VideoSource>>,
    current: usize,
}

impl Playlist {
    pub fn new(sources: Vec<Box<dyn VideoSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(anyhow!("playlist needs at least one video source"));
        }
        Ok(Self {
            sources,
            current: 0,
        })
    }

    pub fn current_name(&self) -> &str {
        self.sources[self.current].name()
    }

    /// Read one frame, advancing (and wrapping) on exhaustion.
    pub fn next_frame(&mut self) -> Result<PlaylistRead> {
        match self.sources[self.current].next_frame()? {
            Some(frame) => Ok(PlaylistRead::Frame(frame)),
            None => {
                let from = self.sources[self.current].name().to_string();
                self.current = (self.current + 1) % self.sources.len();
                self.sources[self.current].reset()?;
                let to = self.sources[self.current].name().to_string();
                log::info!("playlist advanced: {} -> {}", from, to);
                Ok(PlaylistRead::Advanced { from, to })
            }
        }
    }
}

/// Build a source from a playlist entry.
///
/// Only `stub://` synthetic entries are built in; anything else needs an
/// external decoder implementation plugged in by the embedding
/// application.
pub fn open_source(entry: &str) -> Result<Box<dyn VideoSource>> {
    if let Some(rest) = entry.strip_prefix("stub://") {
        let config = SyntheticConfig::parse(rest)?;
        return Ok(Box::new(SyntheticSource::new(config)));
    }
    Err(anyhow!(
        "no built-in decoder for '{}'; provide a VideoSource implementation",
        entry
    ))
}
