//! Sample rate conversion for output devices

/// Convert signed 8-bit samples at `source_rate` to floats at `target_rate`
/// using linear interpolation. Output is in `-1.0..1.0`.
pub fn to_device_rate(samples: &[i8], source_rate: u32, target_rate: u32) -> Vec<f32> {
    let level = |s: i8| s as f32 / 128.0;

    if samples.is_empty() || source_rate == 0 || target_rate == 0 {
        return Vec::new();
    }
    if source_rate == target_rate {
        return samples.iter().copied().map(level).collect();
    }

    let ratio = source_rate as f64 / target_rate as f64;
    let output_len = (samples.len() as u64 * target_rate as u64).div_ceil(source_rate as u64) as usize;
    let mut output = Vec::with_capacity(output_len);

    for i in 0..output_len {
        let pos = i as f64 * ratio;
        let idx = pos.floor() as usize;
        let frac = (pos - idx as f64) as f32;

        let sample = match (samples.get(idx), samples.get(idx + 1)) {
            (Some(&a), Some(&b)) => level(a) + (level(b) - level(a)) * frac,
            (Some(&a), None) => level(a),
            _ => 0.0,
        };
        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_rate_only_converts() {
        let out = to_device_rate(&[0, 64, -128, 127], 16384, 16384);
        assert_eq!(out, vec![0.0, 0.5, -1.0, 127.0 / 128.0]);
    }

    #[test]
    fn test_upsampling_interpolates() {
        let out = to_device_rate(&[0, 64], 8000, 16000);
        assert_eq!(out, vec![0.0, 0.25, 0.5, 0.5]);
    }

    #[test]
    fn test_output_length_follows_rate() {
        // one second of a default-rate channel on a 48kHz device
        let out = to_device_rate(&vec![10i8; 16384], 16384, 48000);
        assert_eq!(out.len(), 48000);
        assert!(out.iter().all(|&s| (s - 10.0 / 128.0).abs() < 1e-6));

        let out = to_device_rate(&vec![10i8; 44100], 44100, 22050);
        assert_eq!(out.len(), 22050);
    }

    #[test]
    fn test_empty_input() {
        assert!(to_device_rate(&[], 8000, 48000).is_empty());
        assert!(to_device_rate(&[1, 2], 0, 48000).is_empty());
    }
}
