use serde::Deserialize;

/// Maps a model's normalised output back to physical units (cm⁻¹ for ZFS,
/// dimensionless for E/D).
///
/// Stored as TOML next to the model weights:
///
/// ```toml
/// kind = "standard"
/// mean = -150.0
/// scale = 80.0
/// ```
///
/// or
///
/// ```toml
/// kind = "min-max"
/// data-min = 0.0
/// data-max = 0.33
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum OutputScaler {
    Standard {
        mean: f64,
        scale: f64,
    },
    #[serde(rename_all = "kebab-case")]
    MinMax {
        data_min: f64,
        data_max: f64,
        #[serde(default = "unit_range")]
        feature_range: [f64; 2],
    },
}

fn unit_range() -> [f64; 2] {
    [0.0, 1.0]
}

impl OutputScaler {
    pub fn inverse_transform(&self, value: f64) -> f64 {
        match *self {
            Self::Standard { mean, scale } => value * scale + mean,
            Self::MinMax {
                data_min,
                data_max,
                feature_range: [low, high],
            } => {
                let span = high - low;
                if span == 0.0 {
                    return data_min;
                }
                (value - low) / span * (data_max - data_min) + data_min
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_scaler_undoes_z_scoring() {
        let scaler: OutputScaler = toml::from_str("kind = \"standard\"\nmean = -150.0\nscale = 80.0\n").unwrap();
        assert_eq!(scaler.inverse_transform(0.0), -150.0);
        assert_eq!(scaler.inverse_transform(-0.5), -190.0);
    }

    #[test]
    fn min_max_scaler_defaults_to_unit_range() {
        let scaler: OutputScaler =
            toml::from_str("kind = \"min-max\"\ndata-min = 0.0\ndata-max = 0.4\n").unwrap();
        assert!((scaler.inverse_transform(0.5) - 0.2).abs() < 1e-12);
        assert_eq!(scaler.inverse_transform(1.0), 0.4);
    }

    #[test]
    fn min_max_scaler_honours_custom_range() {
        let scaler: OutputScaler = toml::from_str(
            "kind = \"min-max\"\ndata-min = 10.0\ndata-max = 20.0\nfeature-range = [-1.0, 1.0]\n",
        )
        .unwrap();
        assert_eq!(scaler.inverse_transform(-1.0), 10.0);
        assert_eq!(scaler.inverse_transform(0.0), 15.0);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        assert!(toml::from_str::<OutputScaler>("kind = \"robust\"\n").is_err());
    }
}
