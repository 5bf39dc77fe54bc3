//! Audio device output using cpal and a ring buffer
//!
//! Each sink owns its own cpal stream on the default output device, opened
//! at the device's default configuration. Channel samples are resampled to
//! the device rate and copied to every device channel.

use super::resample::to_device_rate;
use super::{AudioOutput, AudioSink};
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use ringbuf::{
    traits::{Consumer, Producer, Split},
    HeapCons, HeapProd, HeapRb,
};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error};

/// How long a blocked write/drain sleeps before checking again
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Extra wait after the ring buffer empties, covering device latency
const DRAIN_TAIL: Duration = Duration::from_millis(50);

/// Opens sinks on the system's default output device
#[derive(Debug, Default, Clone, Copy)]
pub struct CpalOutput;

impl CpalOutput {
    pub fn new() -> Self {
        Self
    }
}

impl AudioOutput for CpalOutput {
    type Sink = CpalSink;

    fn open(&self, sample_rate: u32) -> Result<CpalSink> {
        CpalSink::open(sample_rate)
    }
}

/// A playing cpal stream fed from a ring buffer
pub struct CpalSink {
    /// Producer side of the ring buffer (playback thread writes here)
    producer: HeapProd<f32>,
    /// Samples the device callback has consumed
    played: Arc<AtomicUsize>,
    /// Set by the stream's error callback
    failed: Arc<AtomicBool>,
    /// Rate of the samples handed to `write`
    source_rate: u32,
    /// Rate the device plays at
    device_rate: u32,
    /// Samples pushed so far
    written: usize,
    /// The cpal stream (kept alive for the duration)
    _stream: cpal::Stream,
}

impl CpalSink {
    /// Open a stream for samples at `sample_rate`
    pub fn open(sample_rate: u32) -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| Error::SinkUnavailable("No audio output device available".into()))?;

        let default_config = device.default_output_config().map_err(|e| {
            Error::SinkUnavailable(format!("Failed to get default output config: {}", e))
        })?;

        let config = default_config.config();
        let device_rate = config.sample_rate.0;

        // ~250ms of buffered audio
        let capacity = (device_rate as usize / 4).max(1024);
        let (producer, consumer) = HeapRb::<f32>::new(capacity).split();
        let played = Arc::new(AtomicUsize::new(0));
        let failed = Arc::new(AtomicBool::new(false));

        let stream = match default_config.sample_format() {
            cpal::SampleFormat::F32 => {
                build_stream::<f32>(&device, &config, consumer, &played, &failed)?
            }
            cpal::SampleFormat::I16 => {
                build_stream::<i16>(&device, &config, consumer, &played, &failed)?
            }
            cpal::SampleFormat::U16 => {
                build_stream::<u16>(&device, &config, consumer, &played, &failed)?
            }
            format => {
                return Err(Error::SinkUnavailable(format!(
                    "Unsupported sample format: {:?}",
                    format
                )));
            }
        };

        stream
            .play()
            .map_err(|e| Error::SinkUnavailable(format!("Failed to play audio stream: {}", e)))?;

        debug!(
            sample_rate,
            device_rate,
            channels = config.channels,
            "audio stream started"
        );

        Ok(Self {
            producer,
            played,
            failed,
            source_rate: sample_rate,
            device_rate,
            written: 0,
            _stream: stream,
        })
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut consumer: HeapCons<f32>,
    played: &Arc<AtomicUsize>,
    failed: &Arc<AtomicBool>,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels = config.channels.max(1) as usize;
    let played = Arc::clone(played);
    let failed = Arc::clone(failed);
    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                for frame in data.chunks_mut(channels) {
                    let sample = match consumer.try_pop() {
                        Some(s) => {
                            played.fetch_add(1, Ordering::Release);
                            s
                        }
                        None => 0.0,
                    };
                    frame.fill(T::from_sample(sample));
                }
            },
            move |err| {
                error!("Audio stream error: {}", err);
                failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| Error::SinkUnavailable(format!("Failed to build audio stream: {}", e)))
}

impl CpalSink {
    fn check_stream(&self) -> Result<()> {
        if self.failed.load(Ordering::Acquire) {
            return Err(Error::SinkUnavailable("audio stream stopped".into()));
        }
        Ok(())
    }
}

impl AudioSink for CpalSink {
    fn write(&mut self, samples: &[i8]) -> Result<()> {
        let converted = to_device_rate(samples, self.source_rate, self.device_rate);
        let mut pending = converted.as_slice();
        while !pending.is_empty() {
            self.check_stream()?;
            let pushed = self.producer.push_slice(pending);
            pending = &pending[pushed..];
            if !pending.is_empty() {
                thread::sleep(POLL_INTERVAL);
            }
        }
        self.written += converted.len();
        Ok(())
    }

    fn drain(&mut self) -> Result<()> {
        while self.played.load(Ordering::Acquire) < self.written {
            self.check_stream()?;
            thread::sleep(POLL_INTERVAL);
        }
        thread::sleep(DRAIN_TAIL);
        Ok(())
    }
}
