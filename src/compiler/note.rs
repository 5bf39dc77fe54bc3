//! Pitch table, note tokens and frequency calculation

use super::token::Token;
use crate::error::{Error, Result};

/// Rest
pub const PAUSE: i32 = 0;
/// Highest melodic pitch index (B8)
pub const HIGHEST_PITCH: i32 = 99;

pub const DRUM_CLICK: i32 = 100;
pub const DRUM_BASS: i32 = 101;
pub const DRUM_SNARE: i32 = 102;

/// Pitch index of A4 (440Hz)
const A4: i32 = 49;
const A4_FREQUENCY: f64 = 440.0;

/// Rest, the 99 standard keys from A0 to B8 and the drum sounds.
/// Position in this table is the pitch index.
pub static PITCH_NAMES: [&str; 103] = [
    "pause", "A0", "As0", "B0",
    "C1", "Cs1", "D1", "Ds1", "E1", "F1", "Fs1", "G1", "Gs1", "A1", "As1", "B1",
    "C2", "Cs2", "D2", "Ds2", "E2", "F2", "Fs2", "G2", "Gs2", "A2", "As2", "B2",
    "C3", "Cs3", "D3", "Ds3", "E3", "F3", "Fs3", "G3", "Gs3", "A3", "As3", "B3",
    "C4", "Cs4", "D4", "Ds4", "E4", "F4", "Fs4", "G4", "Gs4", "A4", "As4", "B4",
    "C5", "Cs5", "D5", "Ds5", "E5", "F5", "Fs5", "G5", "Gs5", "A5", "As5", "B5",
    "C6", "Cs6", "D6", "Ds6", "E6", "F6", "Fs6", "G6", "Gs6", "A6", "As6", "B6",
    "C7", "Cs7", "D7", "Ds7", "E7", "F7", "Fs7", "G7", "Gs7", "A7", "As7", "B7",
    "C8", "Cs8", "D8", "Ds8", "E8", "F8", "Fs8", "G8", "Gs8", "A8", "As8", "B8",
    "click", "bass", "snare",
];

/// Look up a pitch name (case-sensitive)
pub fn find_pitch(name: &str) -> Option<i32> {
    PITCH_NAMES
        .iter()
        .position(|&n| n == name)
        .map(|i| i as i32)
}

pub fn pitch_name(pitch: i32) -> Option<&'static str> {
    usize::try_from(pitch)
        .ok()
        .and_then(|i| PITCH_NAMES.get(i).copied())
}

/// Name and index of a pitch for messages, e.g. `A4 (49)`
pub fn describe_pitch(pitch: &i32) -> String {
    match pitch_name(*pitch) {
        Some(name) => format!("{} ({})", name, pitch),
        None => pitch.to_string(),
    }
}

pub fn is_drum(pitch: i32) -> bool {
    (DRUM_CLICK..=DRUM_SNARE).contains(&pitch)
}

pub fn is_melodic(pitch: i32) -> bool {
    (1..=HIGHEST_PITCH).contains(&pitch)
}

/// Frequency of a key in Hz: f(n) = 440 * 2^((n-49)/12)
///
/// Rests and anything below are silent (0Hz).
pub fn frequency(pitch: i32) -> f64 {
    if pitch <= PAUSE {
        return 0.0;
    }
    A4_FREQUENCY * 2.0_f64.powf((pitch - A4) as f64 / 12.0)
}

/// A single note or rest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Note {
    /// Pitch index (0 = rest)
    pub pitch: i32,
    /// Duration in milliseconds, tempo already applied
    pub duration_ms: u64,
    /// Source line
    pub line: usize,
}

impl Note {
    /// Parse a `<pitch>,<duration>` token, scaling the duration by `multiplier`
    pub fn parse(token: &Token<'_>, multiplier: f64) -> Result<Self> {
        let malformed = || Error::MalformedNote {
            line: token.line,
            token: token.text.to_string(),
        };

        let (name, raw_duration) = token.text.split_once(',').ok_or_else(malformed)?;

        let pitch = find_pitch(name).ok_or_else(|| Error::UnknownPitch {
            line: token.line,
            name: name.to_string(),
        })?;

        let raw: u32 = raw_duration.parse().map_err(|_| malformed())?;

        Ok(Self {
            pitch,
            duration_ms: (raw as f64 * multiplier) as u64,
            line: token.line,
        })
    }

    pub fn is_rest(&self) -> bool {
        self.pitch == PAUSE
    }
}
