//! Percussion generators
//!
//! `click` and `bass` are decaying sine sweeps, `snare` is white noise that
//! holds full level for a short burst and then falls off.

use super::{quantize, scale};
use crate::compiler::note::{DRUM_BASS, DRUM_CLICK, DRUM_SNARE};
use rand::Rng;

/// Samples of full-level snare noise before the decay starts
const SNARE_BURST: usize = 500;

/// Raw (unquantized) drum value at sample `i` (i >= 1)
fn raw_sample<R: Rng + ?Sized>(pitch: i32, i: usize, rng: &mut R) -> f64 {
    let t = i as f64;
    match pitch {
        DRUM_CLICK => 30000.0 * (0.75 * t.sqrt()).sin() / t,
        DRUM_BASS => 250000.0 * (0.3 * t.sqrt()).sin() / t,
        DRUM_SNARE => {
            let noise = 255.0 * (rng.gen::<f64>() - 0.5);
            if i < SNARE_BURST {
                noise
            } else {
                noise * (SNARE_BURST as f64 / (6.0 * t))
            }
        }
        _ => 0.0,
    }
}

/// Fill `output` with the drum sound selected by `pitch`.
/// The first sample is always silent.
pub fn render<R: Rng + ?Sized>(pitch: i32, volume: f64, rng: &mut R, output: &mut [i8]) {
    for (i, out) in output.iter_mut().enumerate().skip(1) {
        *out = scale(quantize(raw_sample(pitch, i, rng)), volume);
    }
}
