pub mod compiler;
pub mod error;
pub mod playback;
pub mod render;
pub mod report;
pub mod source;
pub mod synth;

pub use compiler::ParsedScore;
pub use error::Error;
pub use render::{render, RenderedScore};
