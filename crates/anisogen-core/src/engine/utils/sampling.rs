use thiserror::Error;

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("Input weight list is empty, cannot perform sampling")]
    EmptyWeights,
    #[error("All weights underflowed to zero, cannot perform sampling")]
    ZeroTotalWeight,
    #[error("Invalid temperature: {0}. Temperature must be positive for softmax sampling")]
    InvalidTemperature(f64),
    #[error("Failed to create weighted distribution: {source}")]
    DistributionError {
        #[from]
        source: rand::distributions::WeightedError,
    },
}

/// Softmax of `weights / temperature`: the probabilities of drawing each
/// index in proportion to `exp(w / temperature)`.
///
/// Weights are shifted by their maximum before exponentiation, so large
/// weights do not overflow. Non-finite weights get probability zero.
pub fn softmax(weights: &[f64], temperature: f64) -> Result<Vec<f64>, SamplingError> {
    if weights.is_empty() {
        return Err(SamplingError::EmptyWeights);
    }
    if !(temperature > 0.0 && temperature.is_finite()) {
        return Err(SamplingError::InvalidTemperature(temperature));
    }

    let max_weight = weights
        .iter()
        .copied()
        .filter(|w| w.is_finite())
        .fold(f64::NEG_INFINITY, f64::max);
    if !max_weight.is_finite() {
        return Err(SamplingError::ZeroTotalWeight);
    }

    let exps: Vec<f64> = weights
        .iter()
        .map(|&w| {
            if w.is_finite() {
                ((w - max_weight) / temperature).exp()
            } else {
                0.0
            }
        })
        .collect();
    let total: f64 = exps.iter().sum();
    if total <= f64::EPSILON {
        return Err(SamplingError::ZeroTotalWeight);
    }
    Ok(exps.into_iter().map(|e| e / total).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::distributions::{Distribution, WeightedIndex};
    use rand::rngs::StdRng;

    #[test]
    fn equal_weights_give_uniform_probabilities() {
        let p = softmax(&[1.0, 1.0, 1.0, 1.0], 1.5).unwrap();
        assert!(p.iter().all(|&x| (x - 0.25).abs() < 1e-12));
    }

    #[test]
    fn heavier_weight_is_more_likely() {
        let p = softmax(&[1.0, 2.5], 1.5).unwrap();
        assert!(p[1] > p[0]);
        assert!((p[1] / p[0] - 1.0f64.exp()).abs() < 1e-12);
    }

    #[test]
    fn sampling_frequency_tracks_probability() {
        let mut rng = StdRng::seed_from_u64(7);
        let probabilities = softmax(&[1.0, 4.0], 1.5).unwrap();
        let expected = probabilities[1];
        let distribution = WeightedIndex::new(&probabilities).unwrap();
        let trials = 20_000;
        let hits = (0..trials)
            .filter(|_| distribution.sample(&mut rng) == 1)
            .count();
        let observed = hits as f64 / trials as f64;
        assert!((observed - expected).abs() < 0.02, "{observed} vs {expected}");
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert!(matches!(softmax(&[], 1.0), Err(SamplingError::EmptyWeights)));
        assert!(matches!(
            softmax(&[1.0], 0.0),
            Err(SamplingError::InvalidTemperature(_))
        ));
        assert!(matches!(
            softmax(&[f64::NAN], 1.0),
            Err(SamplingError::ZeroTotalWeight)
        ));
        let probabilities = softmax(&[f64::INFINITY, 2.0], 1.0).unwrap();
        assert_eq!(probabilities, vec![0.0, 1.0]);
    }
}
