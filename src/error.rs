use crate::compiler::note::describe_pitch;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Malformed document at line {line}: {message}")]
    MalformedDocument { line: usize, message: String },

    #[error("Unsupported construct at line {line}: {message}")]
    UnsupportedConstruct { line: usize, message: String },

    #[error("Invalid argument at line {line}: {message}")]
    InvalidArgument { line: usize, message: String },

    #[error("\"{value}\" is an invalid {field} value")]
    InvalidConfigValue { field: &'static str, value: String },

    #[error("Conflicting config: {0}")]
    ConflictingConfig(String),

    #[error("Note \"{name}\" is not available (line {line})")]
    UnknownPitch { line: usize, name: String },

    #[error("Malformed note \"{token}\" at line {line}")]
    MalformedNote { line: usize, token: String },

    #[error("Note {} can not be played by instrument '{}'", describe_pitch(.pitch), .instrument)]
    InvalidNoteForInstrument { pitch: i32, instrument: &'static str },

    #[error("Note {} transposed by {} is outside the playable range", describe_pitch(.pitch), .transpose)]
    PitchOutOfRange { pitch: i32, transpose: i32 },

    #[error("Channel duration overflows at line {line}")]
    DurationOverflow { line: usize },

    #[error("A {duration_ms}ms note at {sample_rate}Hz is too long to render")]
    NoteTooLong { duration_ms: u64, sample_rate: u32 },

    #[error("Distance between lines can not be bigger than one empty line ({blank_lines} empty lines before line {line})")]
    MisalignedChannels { line: usize, blank_lines: usize },

    #[error("Audio sink unavailable: {0}")]
    SinkUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl Error {
    pub(crate) fn malformed(line: usize, message: impl Into<String>) -> Self {
        Error::MalformedDocument {
            line,
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
