use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A multiset of per-ligand donor counts, stored in descending order so that
/// `{1,2,3}` and `{3,2,1}` are the same pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DonorPattern(Vec<u8>);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PatternParseError {
    #[error("Donor pattern is empty")]
    Empty,
    #[error("Invalid donor count '{0}' (expected an integer between 1 and 255)")]
    InvalidCount(String),
}

impl DonorPattern {
    pub fn new(counts: impl IntoIterator<Item = u8>) -> Self {
        let mut counts: Vec<u8> = counts.into_iter().collect();
        counts.sort_unstable_by(|a, b| b.cmp(a));
        Self(counts)
    }

    pub fn counts(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total(&self) -> u32 {
        self.0.iter().map(|&c| u32::from(c)).sum()
    }

    /// The patterns sampled for a hexacoordinate centre.
    pub fn hexacoordinate_vocabulary() -> Vec<DonorPattern> {
        [
            &[6][..],
            &[3, 3],
            &[4, 1, 1],
            &[2, 2, 2],
            &[1, 2, 3],
            &[1, 1, 1, 1, 1, 1],
            &[5, 1],
        ]
        .into_iter()
        .map(|counts| DonorPattern::new(counts.iter().copied()))
        .collect()
    }

    /// Every partition of `total` into positive parts, largest parts first.
    pub fn partitions(total: u8) -> Vec<DonorPattern> {
        fn extend(remaining: u8, max_part: u8, prefix: &mut Vec<u8>, out: &mut Vec<DonorPattern>) {
            if remaining == 0 {
                out.push(DonorPattern(prefix.clone()));
                return;
            }
            for part in (1..=remaining.min(max_part)).rev() {
                prefix.push(part);
                extend(remaining - part, part, prefix, out);
                prefix.pop();
            }
        }
        let mut out = Vec::new();
        if total > 0 {
            extend(total, total, &mut Vec::new(), &mut out);
        }
        out
    }

    /// The default vocabulary for a coordination number: the curated
    /// hexacoordinate set for 6, every partition otherwise.
    pub fn default_vocabulary(coordination_number: u8) -> Vec<DonorPattern> {
        if coordination_number == 6 {
            Self::hexacoordinate_vocabulary()
        } else {
            Self::partitions(coordination_number)
        }
    }
}

impl fmt::Display for DonorPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("{")?;
        for (i, count) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{count}")?;
        }
        f.write_str("}")
    }
}

/// Accepts `4,1,1`, `{4,1,1}` or `[4, 1, 1]`.
impl FromStr for DonorPattern {
    type Err = PatternParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let inner = s
            .trim()
            .trim_start_matches(['{', '['])
            .trim_end_matches(['}', ']']);
        if inner.trim().is_empty() {
            return Err(PatternParseError::Empty);
        }
        let counts = inner
            .split(',')
            .map(|part| {
                let part = part.trim();
                part.parse::<u8>()
                    .ok()
                    .filter(|&c| c > 0)
                    .ok_or_else(|| PatternParseError::InvalidCount(part.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DonorPattern::new(counts))
    }
}

impl serde::Serialize for DonorPattern {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> serde::Deserialize<'de> for DonorPattern {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_of_counts_does_not_matter() {
        assert_eq!(DonorPattern::new([1, 2, 3]), DonorPattern::new([3, 1, 2]));
        assert_eq!(DonorPattern::new([1, 4, 1]).counts(), &[4, 1, 1]);
    }

    #[test]
    fn vocabulary_patterns_all_sum_to_six() {
        let vocabulary = DonorPattern::hexacoordinate_vocabulary();
        assert_eq!(vocabulary.len(), 7);
        assert!(vocabulary.iter().all(|p| p.total() == 6));
    }

    #[test]
    fn partitions_enumerate_every_multiset_once() {
        let four = DonorPattern::partitions(4);
        let rendered: Vec<String> = four.iter().map(ToString::to_string).collect();
        assert_eq!(rendered, vec!["{4}", "{3,1}", "{2,2}", "{2,1,1}", "{1,1,1,1}"]);
        assert_eq!(DonorPattern::partitions(6).len(), 11);
        assert!(DonorPattern::partitions(0).is_empty());
        assert_eq!(DonorPattern::default_vocabulary(6).len(), 7);
        assert_eq!(DonorPattern::default_vocabulary(3).len(), 3);
    }

    #[test]
    fn parses_and_displays_braced_form() {
        let pattern: DonorPattern = "[4, 1, 1]".parse().unwrap();
        assert_eq!(pattern.to_string(), "{4,1,1}");
        assert_eq!("{1,2,3}".parse::<DonorPattern>().unwrap(), DonorPattern::new([3, 2, 1]));
        assert_eq!("".parse::<DonorPattern>(), Err(PatternParseError::Empty));
        assert!(matches!(
            "2,x".parse::<DonorPattern>(),
            Err(PatternParseError::InvalidCount(_))
        ));
        assert!("0,6".parse::<DonorPattern>().is_err());
    }
}
