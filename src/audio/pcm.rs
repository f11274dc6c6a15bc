//! PCM encoding for the transport wire format.
//!
//! The backend expects 16-bit fixed-point mono samples. Conversion is a pure
//! function over normalized floats: clamp to [-1, 1], scale by 32767,
//! truncate. NaN encodes as 0.

/// Convert normalized f32 samples to 16-bit PCM.
pub fn encode(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&s| {
            let s = if s.is_nan() { 0.0 } else { s };
            (s.clamp(-1.0, 1.0) * 32767.0) as i16
        })
        .collect()
}

/// Flatten 16-bit PCM samples to little-endian bytes for the wire.
pub fn to_le_bytes(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_and_clamps_range_bounds() {
        let samples = vec![1.0, -1.0, 0.0, 2.0, -2.0];
        assert_eq!(encode(&samples), vec![32767, -32767, 0, 32767, -32767]);
    }

    #[test]
    fn truncates_toward_zero() {
        // 0.5 * 32767 = 16383.5 -> 16383
        assert_eq!(encode(&[0.5]), vec![16383]);
        assert_eq!(encode(&[-0.5]), vec![-16383]);
    }

    #[test]
    fn nan_encodes_as_zero() {
        assert_eq!(encode(&[f32::NAN]), vec![0]);
    }

    #[test]
    fn output_length_matches_input() {
        let samples = vec![0.1f32; 4096];
        assert_eq!(encode(&samples).len(), 4096);
    }

    #[test]
    fn le_bytes_layout() {
        assert_eq!(to_le_bytes(&[1, -1]), vec![0x01, 0x00, 0xff, 0xff]);
    }
}
