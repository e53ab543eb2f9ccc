use super::{ShCoefficients, PROBE_FLOAT_COUNT};
use crate::error::{BakeError, BakeResult};

/// Number of probes held by a flat coefficient buffer.
pub fn probe_count(buffer: &[f32]) -> BakeResult<usize> {
    if buffer.len() % PROBE_FLOAT_COUNT != 0 {
        return Err(BakeError::invalid(format!(
            "probe buffer length {} is not a multiple of {PROBE_FLOAT_COUNT}",
            buffer.len()
        )));
    }
    Ok(buffer.len() / PROBE_FLOAT_COUNT)
}

/// Move every probe in `buffer` towards `sh` by `strength`.
///
/// `strength` is clamped to [0, 1]; 0 leaves the buffer untouched and 1
/// writes `sh` into every probe. Returns the number of probes.
pub fn blend_into_probe_coefficients(
    buffer: &mut [f32],
    sh: &ShCoefficients,
    strength: f32,
) -> BakeResult<usize> {
    let probes = probe_count(buffer)?;

    let strength = if strength.is_nan() {
        log::warn!("Probe blend strength is NaN, treating it as 0");
        0.0
    } else if !(0.0..=1.0).contains(&strength) {
        log::warn!("Probe blend strength {strength} clamped to [0, 1]");
        strength.clamp(0.0, 1.0)
    } else {
        strength
    };

    if strength == 0.0 {
        return Ok(probes);
    }

    let target = sh.to_array();
    for probe in buffer.chunks_exact_mut(PROBE_FLOAT_COUNT) {
        for (value, new) in probe.iter_mut().zip(target.iter()) {
            *value = *value * (1.0 - strength) + *new * strength;
        }
    }
    log::debug!("Blended SH into {probes} probes (strength {strength})");
    Ok(probes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    fn sample_sh() -> ShCoefficients {
        let mut coefficients = [Vec3::ZERO; 9];
        for (i, c) in coefficients.iter_mut().enumerate() {
            *c = Vec3::new(i as f32, -(i as f32) * 0.5, 1.0 + i as f32 * 0.25);
        }
        ShCoefficients::new(coefficients)
    }

    fn sample_buffer(probes: usize) -> Vec<f32> {
        (0..probes * PROBE_FLOAT_COUNT)
            .map(|i| (i as f32 * 0.731).sin() * 4.0)
            .collect()
    }

    #[test]
    fn test_zero_strength_is_noop() {
        let original = sample_buffer(3);
        let mut buffer = original.clone();
        assert_eq!(blend_into_probe_coefficients(&mut buffer, &sample_sh(), 0.0), Ok(3));
        assert_eq!(buffer, original);
    }

    #[test]
    fn test_full_strength_broadcasts() {
        let mut buffer = sample_buffer(4);
        blend_into_probe_coefficients(&mut buffer, &sample_sh(), 1.0).unwrap();
        let target = sample_sh().to_array();
        for probe in buffer.chunks_exact(PROBE_FLOAT_COUNT) {
            assert_eq!(probe, &target[..]);
        }
    }

    #[test]
    fn test_half_strength_is_midpoint() {
        let original = sample_buffer(2);
        let mut buffer = original.clone();
        blend_into_probe_coefficients(&mut buffer, &sample_sh(), 0.5).unwrap();
        let target = sample_sh().to_array();
        for (i, value) in buffer.iter().enumerate() {
            let expected = 0.5 * (original[i] + target[i % PROBE_FLOAT_COUNT]);
            assert!((value - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_out_of_range_strength_is_clamped() {
        let original = sample_buffer(1);

        let mut below = original.clone();
        blend_into_probe_coefficients(&mut below, &sample_sh(), -2.0).unwrap();
        assert_eq!(below, original);

        let mut above = original.clone();
        blend_into_probe_coefficients(&mut above, &sample_sh(), 7.5).unwrap();
        assert_eq!(&above[..], &sample_sh().to_array()[..]);

        let mut nan = original.clone();
        blend_into_probe_coefficients(&mut nan, &sample_sh(), f32::NAN).unwrap();
        assert_eq!(nan, original);
    }

    #[test]
    fn test_layout_and_length_preserved() {
        let mut buffer = sample_buffer(5);
        blend_into_probe_coefficients(&mut buffer, &sample_sh(), 0.3).unwrap();
        assert_eq!(buffer.len(), 5 * PROBE_FLOAT_COUNT);
        assert_eq!(probe_count(&buffer), Ok(5));
    }

    #[test]
    fn test_empty_buffer_has_no_probes() {
        let mut buffer: Vec<f32> = Vec::new();
        assert_eq!(blend_into_probe_coefficients(&mut buffer, &sample_sh(), 1.0), Ok(0));
    }

    #[test]
    fn test_rejects_partial_probe() {
        let mut buffer = vec![0.0; PROBE_FLOAT_COUNT + 3];
        assert!(matches!(
            blend_into_probe_coefficients(&mut buffer, &sample_sh(), 0.5),
            Err(BakeError::InvalidInput(_))
        ));
    }
}
