//! Waveform synthesis
//!
//! Every instrument maps a pitch and a duration to signed 8-bit samples.
//! Each raw formula value is narrowed to a byte, multiplied by the channel
//! volume and narrowed again, which is what gives the instruments their
//! characteristic (slightly crunchy) timbre.

pub mod drum;

use crate::compiler::note::{self, frequency};
use crate::error::{Error, Result};
use rand::Rng;
use std::f64::consts::PI;

/// Sample rate of the `default` config value and of every rest
pub const DEFAULT_SAMPLE_RATE: u32 = 16384;

/// Attack length of the oboe, in samples
const OBOE_ATTACK: usize = 1500;
/// Attack length of the flute, in samples
const FLUTE_ATTACK: usize = 1000;

/// Instrument selected by a channel's config
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Instrument {
    /// Silence, useful for muting a channel
    Test,
    SinWave,
    SqWave,
    SawtoothWave,
    TriangleWave,
    Drum,
    DrawOrgan,
    Oboe,
    Flute,
}

impl Instrument {
    pub const ALL: [Instrument; 9] = [
        Instrument::Test,
        Instrument::SinWave,
        Instrument::SqWave,
        Instrument::SawtoothWave,
        Instrument::TriangleWave,
        Instrument::Drum,
        Instrument::DrawOrgan,
        Instrument::Oboe,
        Instrument::Flute,
    ];

    /// Name used in the `instrument=` config field
    pub fn name(&self) -> &'static str {
        match self {
            Self::Test => "test",
            Self::SinWave => "sinwave",
            Self::SqWave => "sqwave",
            Self::SawtoothWave => "sawtoothwave",
            Self::TriangleWave => "trianglewave",
            Self::Drum => "drum",
            Self::DrawOrgan => "draworgan",
            Self::Oboe => "oboe",
            Self::Flute => "flute",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.name() == name)
    }

    pub fn is_drum(&self) -> bool {
        matches!(self, Self::Drum)
    }

    /// Check that `pitch` is something this instrument can play
    pub fn check_pitch(&self, pitch: i32) -> Result<()> {
        let ok = if self.is_drum() {
            note::is_drum(pitch)
        } else {
            !note::is_drum(pitch)
        };
        if ok {
            Ok(())
        } else {
            Err(Error::InvalidNoteForInstrument {
                pitch,
                instrument: self.name(),
            })
        }
    }
}

/// Number of samples covering `duration_ms` at `sample_rate`
pub fn sample_count(duration_ms: u64, sample_rate: u32) -> Result<usize> {
    let too_long = || Error::NoteTooLong {
        duration_ms,
        sample_rate,
    };
    let count = duration_ms
        .checked_mul(sample_rate as u64)
        .ok_or_else(too_long)?
        / 1000;
    usize::try_from(count).map_err(|_| too_long())
}

/// Zeroed buffer of `sample_count(duration_ms, sample_rate)` samples.
/// Fails instead of aborting when the allocation is impossible.
fn zeroed(duration_ms: u64, sample_rate: u32) -> Result<Vec<i8>> {
    let len = sample_count(duration_ms, sample_rate)?;
    let mut buf = Vec::new();
    buf.try_reserve_exact(len).map_err(|_| Error::NoteTooLong {
        duration_ms,
        sample_rate,
    })?;
    buf.resize(len, 0);
    Ok(buf)
}

/// Narrow a raw value to a signed byte: truncate toward zero, then keep
/// the low 8 bits. NaN becomes 0.
#[inline]
pub fn quantize(value: f64) -> i8 {
    value as i32 as i8
}

/// Apply channel volume to an already quantized sample
#[inline]
pub fn scale(sample: i8, volume: f64) -> i8 {
    quantize(sample as f64 * volume)
}

/// All-zero buffer for a rest; rests always use the default sample rate
pub fn silence(duration_ms: u64) -> Result<Vec<i8>> {
    zeroed(duration_ms, DEFAULT_SAMPLE_RATE)
}

/// Render one note with the thread-local RNG feeding the snare
pub fn synthesize(
    pitch: i32,
    duration_ms: u64,
    volume: f64,
    sample_rate: u32,
    instrument: Instrument,
) -> Result<Vec<i8>> {
    synthesize_with_rng(
        pitch,
        duration_ms,
        volume,
        sample_rate,
        instrument,
        &mut rand::thread_rng(),
    )
}

/// Render one note
///
/// Returns exactly `duration_ms * sample_rate / 1000` samples.
pub fn synthesize_with_rng<R: Rng + ?Sized>(
    pitch: i32,
    duration_ms: u64,
    volume: f64,
    sample_rate: u32,
    instrument: Instrument,
    rng: &mut R,
) -> Result<Vec<i8>> {
    instrument.check_pitch(pitch)?;

    let mut output = zeroed(duration_ms, sample_rate)?;

    if instrument.is_drum() {
        drum::render(pitch, volume, rng, &mut output);
        return Ok(output);
    }

    let freq = frequency(pitch);
    let period = sample_rate as f64 / freq;
    let step = 2.0 * PI / period;

    match instrument {
        Instrument::SinWave => fill(&mut output, volume, |i| {
            quantize((step * i as f64).sin() * 127.0) as f64
        }),
        Instrument::SqWave => {
            let high = quantize(32.0 * volume);
            let low = quantize(-32.0 * volume);
            for (i, out) in output.iter_mut().enumerate() {
                let sample = (step * i as f64).sin() * 127.0;
                *out = if sample > 0.0 {
                    high
                } else if sample < 0.0 {
                    low
                } else {
                    0
                };
            }
        }
        Instrument::SawtoothWave => fill(&mut output, volume, |i| {
            let ramp = quantize(-(i as f64 * freq / 64.0) % 128.0);
            (ramp as i32 / 3) as f64
        }),
        Instrument::TriangleWave => fill(&mut output, volume, |i| {
            let phase = (i as f64 / 8195.0 * freq) % 2.0;
            quantize(((phase - 1.0).abs() - 0.5) * 100.0) as f64
        }),
        Instrument::DrawOrgan => fill(&mut output, volume, |i| {
            let a = step * i as f64;
            let sum = a.sin() + (2.0 * a).cos() + (3.0 * a).sin() + (4.0 * a).cos()
                - 0.25 * (5.0 * a).sin()
                - (6.0 * a).cos()
                - 0.075 * (8.0 * a).sin();
            quantize(sum * 20.0) as f64
        }),
        Instrument::Oboe => fill(&mut output, volume, |i| {
            let a = step * i as f64;
            let sum = -a.sin() + (2.0 * a).sin() - (3.0 * a).sin()
                + (4.0 * a).sin()
                + (5.0 * a).sin()
                + (6.0 * a).sin()
                + (7.0 * a).sin()
                + 0.37 * (8.0 * a).sin();
            quantize(sum * attack(i, OBOE_ATTACK) * wave_envelope(a) * 12.0) as f64
        }),
        Instrument::Flute => fill(&mut output, volume, |i| {
            let a = step * i as f64;
            let sum = -a.sin() - (2.0 * a).sin() - 0.185 * (3.0 * a).sin()
                + 0.05 * (4.0 * a).cos();
            quantize(sum * attack(i, FLUTE_ATTACK) * wave_envelope(a) * 60.0) as f64
        }),
        Instrument::Test | Instrument::Drum => {}
    }

    Ok(output)
}

/// Write `volume`-scaled samples produced by `sample` into `output`
fn fill<F: Fn(usize) -> f64>(output: &mut [i8], volume: f64, sample: F) {
    for (i, out) in output.iter_mut().enumerate() {
        *out = scale(quantize(sample(i)), volume);
    }
}

/// Linear fade-in over the first `length` samples
fn attack(i: usize, length: usize) -> f64 {
    if i < length {
        i as f64 / length as f64
    } else {
        1.0
    }
}

/// Slow amplitude wobble shared by the wind instruments.
/// NaN at angle 0, which quantizes to silence.
fn wave_envelope(angle: f64) -> f64 {
    1.0 + 3.0 * (0.000002 * angle.powi(2)).sin() / (2.0 * angle).sqrt()
}
