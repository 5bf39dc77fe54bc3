//! Channel configuration and note sequences

use super::note::{self, Note};
use crate::error::{Error, Result};
use crate::synth::{Instrument, DEFAULT_SAMPLE_RATE};

/// Optional `key=` prefixes of the four positional config fields
const LABELS: [&str; 4] = ["volume=", "transpos=", "samplerate=", "instrument="];

/// Per-channel settings from the `config ... endconfig` block
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChannelConfig {
    /// Volume multiplier (config value / 100)
    pub volume: f64,
    /// Transposition in semitones
    pub transpose: i32,
    /// Sample rate in Hz
    pub sample_rate: u32,
    pub instrument: Instrument,
}

impl ChannelConfig {
    /// Parse the words between `config` and `endconfig`
    pub fn parse(words: &[&str]) -> Result<Self> {
        let fields: Vec<&str> = words.iter().map(|w| strip_label(w)).collect();
        let field = |i: usize| fields.get(i).copied().unwrap_or("");

        let invalid = |name: &'static str, value: &str| Error::InvalidConfigValue {
            field: name,
            value: value.to_string(),
        };

        let volume = field(0)
            .parse::<i32>()
            .map_err(|_| invalid("volume", field(0)))? as f64
            / 100.0;

        let transpose = field(1)
            .parse::<i32>()
            .map_err(|_| invalid("transposition", field(1)))?;

        let sample_rate =
            parse_sample_rate(field(2)).ok_or_else(|| invalid("sample rate", field(2)))?;

        let instrument =
            Instrument::from_name(field(3)).ok_or_else(|| invalid("instrument", field(3)))?;

        if instrument.is_drum() && transpose != 0 {
            return Err(Error::ConflictingConfig(
                "Transposition of a drum channel can only be 0.".to_string(),
            ));
        }

        Ok(Self {
            volume,
            transpose,
            sample_rate,
            instrument,
        })
    }

    /// Pitch index actually sent to the synthesizer for `note`
    pub fn sounding_pitch(&self, note: &Note) -> i32 {
        note.pitch + self.transpose
    }

    /// Check that `note` is playable on this channel
    pub fn check_note(&self, note: &Note) -> Result<()> {
        if note.is_rest() {
            return Ok(());
        }
        self.instrument.check_pitch(note.pitch)?;
        if !self.instrument.is_drum() && !note::is_melodic(self.sounding_pitch(note)) {
            return Err(Error::PitchOutOfRange {
                pitch: note.pitch,
                transpose: self.transpose,
            });
        }
        Ok(())
    }
}

fn strip_label(word: &str) -> &str {
    LABELS
        .iter()
        .find_map(|label| word.strip_prefix(label))
        .unwrap_or(word)
}

/// `default`, `<n>kHz` (n * 1024, fractional part dropped) or `<n>Hz`
pub fn parse_sample_rate(value: &str) -> Option<u32> {
    let rate = if value == "default" {
        DEFAULT_SAMPLE_RATE
    } else if let Some(khz) = value.strip_suffix("kHz") {
        let khz: f64 = khz.parse().ok()?;
        if !khz.is_finite() || khz < 0.0 {
            return None;
        }
        (khz as u32).checked_mul(1024)?
    } else if let Some(hz) = value.strip_suffix("Hz") {
        hz.parse().ok()?
    } else {
        return None;
    };
    (rate > 0).then_some(rate)
}

/// One instrument track
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    /// Position in the document (0-based)
    pub index: usize,
    pub config: ChannelConfig,
    pub notes: Vec<Note>,
    /// Sum of all note durations
    pub duration_ms: u64,
}

impl Channel {
    pub fn new(index: usize, config: ChannelConfig) -> Self {
        Self {
            index,
            config,
            notes: Vec::new(),
            duration_ms: 0,
        }
    }

    /// Append a note after checking it against the channel's instrument
    pub fn push(&mut self, note: Note) -> Result<()> {
        self.config.check_note(&note)?;
        self.duration_ms = self
            .duration_ms
            .checked_add(note.duration_ms)
            .ok_or(Error::DurationOverflow { line: note.line })?;
        self.notes.push(note);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(s: &str) -> Vec<&str> {
        s.split_whitespace().collect()
    }

    #[test]
    fn test_parse_labelled_config() {
        let cfg =
            ChannelConfig::parse(&words("volume=80 transpos=-12 samplerate=default instrument=oboe"))
                .unwrap();
        assert_eq!(cfg.volume, 0.8);
        assert_eq!(cfg.transpose, -12);
        assert_eq!(cfg.sample_rate, 16384);
        assert_eq!(cfg.instrument, Instrument::Oboe);
    }

    #[test]
    fn test_parse_bare_config() {
        let cfg = ChannelConfig::parse(&words("100 0 44100Hz sqwave")).unwrap();
        assert_eq!(cfg.volume, 1.0);
        assert_eq!(cfg.sample_rate, 44100);
        assert_eq!(cfg.instrument, Instrument::SqWave);
    }

    #[test]
    fn test_sample_rate_forms() {
        assert_eq!(parse_sample_rate("default"), Some(16384));
        assert_eq!(parse_sample_rate("8kHz"), Some(8192));
        assert_eq!(parse_sample_rate("22.05kHz"), Some(22528));
        assert_eq!(parse_sample_rate("11025Hz"), Some(11025));
        assert_eq!(parse_sample_rate("0Hz"), None);
        assert_eq!(parse_sample_rate("fast"), None);
        assert_eq!(parse_sample_rate("44100"), None);
        assert_eq!(parse_sample_rate("-8kHz"), None);
    }

    #[test]
    fn test_invalid_fields() {
        let err = ChannelConfig::parse(&words("volume=loud transpos=0 samplerate=default instrument=flute"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { field: "volume", ref value } if value == "loud"));

        let err = ChannelConfig::parse(&words("volume=50 transpos=+x samplerate=default instrument=flute"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { field: "transposition", .. }));

        let err = ChannelConfig::parse(&words("volume=50 transpos=0 samplerate=9MHz instrument=flute"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { field: "sample rate", .. }));

        let err = ChannelConfig::parse(&words("volume=50 transpos=0 samplerate=default instrument=piano"))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { field: "instrument", ref value } if value == "piano"));
    }

    #[test]
    fn test_empty_config() {
        let err = ChannelConfig::parse(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { field: "volume", ref value } if value.is_empty()));
    }

    #[test]
    fn test_drum_transpose_conflict() {
        let err = ChannelConfig::parse(&words("volume=50 transpos=5 samplerate=default instrument=drum"))
            .unwrap_err();
        assert!(matches!(err, Error::ConflictingConfig(_)));
        assert!(ChannelConfig::parse(&words("50 0 default drum")).is_ok());
    }

    #[test]
    fn test_channel_push() {
        let cfg = ChannelConfig::parse(&words("100 12 default sinwave")).unwrap();
        let mut channel = Channel::new(0, cfg);
        channel
            .push(Note { pitch: 49, duration_ms: 100, line: 1 })
            .unwrap();
        channel
            .push(Note { pitch: 0, duration_ms: 50, line: 1 })
            .unwrap();
        assert_eq!(channel.duration_ms, 150);
        assert_eq!(cfg.sounding_pitch(&channel.notes[0]), 61);

        let err = channel
            .push(Note { pitch: 95, duration_ms: 10, line: 2 })
            .unwrap_err();
        assert!(matches!(err, Error::PitchOutOfRange { pitch: 95, transpose: 12 }));
        assert_eq!(
            err.to_string(),
            "Note G8 (95) transposed by 12 is outside the playable range"
        );

        let err = channel
            .push(Note { pitch: note::DRUM_SNARE, duration_ms: 10, line: 2 })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidNoteForInstrument { .. }));
        assert_eq!(channel.notes.len(), 2);
    }

    #[test]
    fn test_channel_duration_overflow() {
        let cfg = ChannelConfig::parse(&words("100 0 default sinwave")).unwrap();
        let mut channel = Channel::new(0, cfg);
        channel
            .push(Note { pitch: 49, duration_ms: u64::MAX - 5, line: 1 })
            .unwrap();
        let err = channel
            .push(Note { pitch: 49, duration_ms: 10, line: 2 })
            .unwrap_err();
        assert!(matches!(err, Error::DurationOverflow { line: 2 }));
        assert_eq!(channel.notes.len(), 1);
        assert_eq!(channel.duration_ms, u64::MAX - 5);
    }

    #[test]
    fn test_drum_channel_rejects_melody() {
        let cfg = ChannelConfig::parse(&words("100 0 default drum")).unwrap();
        let mut channel = Channel::new(1, cfg);
        channel
            .push(Note { pitch: note::DRUM_BASS, duration_ms: 10, line: 1 })
            .unwrap();
        channel
            .push(Note { pitch: 0, duration_ms: 10, line: 1 })
            .unwrap();
        let err = channel
            .push(Note { pitch: 49, duration_ms: 10, line: 1 })
            .unwrap_err();
        assert!(matches!(err, Error::InvalidNoteForInstrument { pitch: 49, instrument: "drum" }));
        assert_eq!(err.to_string(), "Note A4 (49) can not be played by instrument 'drum'");
    }
}
