//! Playback scheduling
//!
//! Every rendered channel is streamed to its own audio sink from its own
//! thread. Threads are started one after another with no start barrier, so
//! channels may begin a few milliseconds apart. A channel whose sink fails
//! is dropped without affecting the others.

#[cfg(feature = "playback")]
pub mod device;
pub mod resample;

use crate::error::{Error, Result};
use crate::render::{RenderedChannel, RenderedScore};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use tracing::{info, warn};

/// An open, mono, signed 8-bit audio stream. Closed on drop.
pub trait AudioSink {
    /// Queue samples, blocking while the stream is full
    fn write(&mut self, samples: &[i8]) -> Result<()>;

    /// Block until everything written has been played
    fn drain(&mut self) -> Result<()>;
}

/// Something that can open audio sinks at a given sample rate
pub trait AudioOutput: Send + Sync {
    type Sink: AudioSink;

    fn open(&self, sample_rate: u32) -> Result<Self::Sink>;
}

/// What happened to one channel's playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelOutcome {
    Played { index: usize, samples: usize },
    Dropped { index: usize, reason: String },
}

impl ChannelOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Played { index, .. } | Self::Dropped { index, .. } => *index,
        }
    }

    pub fn is_played(&self) -> bool {
        matches!(self, Self::Played { .. })
    }
}

enum Slot {
    Running(usize, JoinHandle<ChannelOutcome>),
    Failed(ChannelOutcome),
}

/// Handle on the channel threads of one playback run
pub struct Playback {
    slots: Vec<Slot>,
}

impl Playback {
    /// Whether every channel has finished (or was dropped)
    pub fn is_finished(&self) -> bool {
        self.slots.iter().all(|slot| match slot {
            Slot::Running(_, handle) => handle.is_finished(),
            Slot::Failed(_) => true,
        })
    }

    /// Wait for every channel to drain. Outcomes are in channel order.
    pub fn wait(self) -> Vec<ChannelOutcome> {
        self.slots
            .into_iter()
            .map(|slot| match slot {
                Slot::Running(index, handle) => {
                    handle.join().unwrap_or_else(|_| ChannelOutcome::Dropped {
                        index,
                        reason: "playback thread panicked".to_string(),
                    })
                }
                Slot::Failed(outcome) => outcome,
            })
            .collect()
    }
}

/// Start one playback thread per channel, in rendering order
pub fn start<O>(output: Arc<O>, score: RenderedScore) -> Playback
where
    O: AudioOutput + 'static,
{
    let mut slots = Vec::with_capacity(score.channels.len());

    for channel in score.channels {
        let index = channel.index;
        let output = Arc::clone(&output);
        let spawned = thread::Builder::new()
            .name(format!("nsmf-channel-{}", index))
            .spawn(move || play_channel(output.as_ref(), channel));

        slots.push(match spawned {
            Ok(handle) => Slot::Running(index, handle),
            Err(e) => {
                warn!(channel = index, "could not start playback thread: {}", e);
                Slot::Failed(ChannelOutcome::Dropped {
                    index,
                    reason: e.to_string(),
                })
            }
        });
    }

    Playback { slots }
}

/// Start playback and wait for all channels
pub fn play<O>(output: Arc<O>, score: RenderedScore) -> Vec<ChannelOutcome>
where
    O: AudioOutput + 'static,
{
    start(output, score).wait()
}

fn play_channel<O: AudioOutput>(output: &O, channel: RenderedChannel) -> ChannelOutcome {
    let index = channel.index;
    match stream(output, &channel) {
        Ok(()) => {
            info!(channel = index, samples = channel.samples.len(), "channel finished");
            ChannelOutcome::Played {
                index,
                samples: channel.samples.len(),
            }
        }
        Err(e) => {
            warn!(channel = index, "channel dropped: {}", e);
            ChannelOutcome::Dropped {
                index,
                reason: e.to_string(),
            }
        }
    }
}

fn stream<O: AudioOutput>(output: &O, channel: &RenderedChannel) -> Result<()> {
    let mut sink = output.open(channel.sample_rate)?;
    info!(
        channel = channel.index,
        sample_rate = channel.sample_rate,
        "channel started"
    );
    sink.write(&channel.samples)?;
    sink.drain()
}

/// A stream captured by [`MemoryOutput`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Capture {
    pub sample_rate: u32,
    pub samples: Vec<i8>,
    /// Whether `drain` was called
    pub drained: bool,
}

/// Output that records every stream in memory instead of playing it.
/// Sample rates listed in `unavailable` fail to open.
#[derive(Debug, Default)]
pub struct MemoryOutput {
    captures: Arc<Mutex<Vec<Capture>>>,
    unavailable: Vec<u32>,
}

impl MemoryOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to open sinks at `sample_rate`
    pub fn with_unavailable_rate(mut self, sample_rate: u32) -> Self {
        self.unavailable.push(sample_rate);
        self
    }

    /// Streams closed so far, in completion order
    pub fn captures(&self) -> Vec<Capture> {
        self.captures
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

pub struct MemorySink {
    current: Capture,
    captures: Arc<Mutex<Vec<Capture>>>,
}

impl AudioOutput for MemoryOutput {
    type Sink = MemorySink;

    fn open(&self, sample_rate: u32) -> Result<MemorySink> {
        if self.unavailable.contains(&sample_rate) {
            return Err(Error::SinkUnavailable(format!(
                "{}Hz output is busy",
                sample_rate
            )));
        }
        Ok(MemorySink {
            current: Capture {
                sample_rate,
                samples: Vec::new(),
                drained: false,
            },
            captures: Arc::clone(&self.captures),
        })
    }
}

impl AudioSink for MemorySink {
    fn write(&mut self, samples: &[i8]) -> Result<()> {
        self.current.samples.extend_from_slice(samples);
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        self.current.drained = true;
        Ok(())
    }
}

impl Drop for MemorySink {
    fn drop(&mut self) {
        if let Ok(mut captures) = self.captures.lock() {
            captures.push(self.current.clone());
        }
    }
}
