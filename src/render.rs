//! Channel rendering - one contiguous sample buffer per channel

use crate::compiler::channel::Channel;
use crate::compiler::ParsedScore;
use crate::error::{Error, Result};
use crate::synth;
use tracing::debug;

/// Samples of one channel, ready for playback
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedChannel {
    /// Channel index in the document
    pub index: usize,
    /// Rate the buffer must be played at
    pub sample_rate: u32,
    pub samples: Vec<i8>,
    /// Sum of the channel's note durations
    pub duration_ms: u64,
}

/// All channels of a score
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RenderedScore {
    pub channels: Vec<RenderedChannel>,
}

impl RenderedScore {
    pub fn longest_duration_ms(&self) -> u64 {
        self.channels
            .iter()
            .map(|c| c.duration_ms)
            .max()
            .unwrap_or(0)
    }
}

/// Render every channel of `score` in document order
pub fn render(score: &ParsedScore) -> Result<RenderedScore> {
    let channels = score
        .channels
        .iter()
        .map(render_channel)
        .collect::<Result<Vec<_>>>()?;
    Ok(RenderedScore { channels })
}

/// Concatenate the synthesized notes of one channel
pub fn render_channel(channel: &Channel) -> Result<RenderedChannel> {
    let config = &channel.config;
    let capacity = channel.notes.iter().try_fold(0usize, |total, n| {
        let rate = if n.is_rest() {
            synth::DEFAULT_SAMPLE_RATE
        } else {
            config.sample_rate
        };
        total
            .checked_add(synth::sample_count(n.duration_ms, rate)?)
            .ok_or(Error::NoteTooLong {
                duration_ms: n.duration_ms,
                sample_rate: rate,
            })
    })?;
    let mut samples = Vec::new();
    samples
        .try_reserve_exact(capacity)
        .map_err(|_| Error::NoteTooLong {
            duration_ms: channel.duration_ms,
            sample_rate: config.sample_rate,
        })?;

    for note in &channel.notes {
        if note.is_rest() {
            samples.extend(synth::silence(note.duration_ms)?);
        } else {
            samples.extend(synth::synthesize(
                config.sounding_pitch(note),
                note.duration_ms,
                config.volume,
                config.sample_rate,
                config.instrument,
            )?);
        }
    }

    debug!(
        channel = channel.index,
        samples = samples.len(),
        sample_rate = config.sample_rate,
        "rendered channel"
    );

    Ok(RenderedChannel {
        index: channel.index,
        sample_rate: config.sample_rate,
        samples,
        duration_ms: channel.duration_ms,
    })
}
