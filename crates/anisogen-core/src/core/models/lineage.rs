use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationOperator {
    MethylAddition,
    EthylAddition,
    IsopropylAddition,
    AtomTypeSubstitution,
    HalogenExchange,
}

impl MutationOperator {
    /// Operators in the order they are applied to each parent.
    pub const ALL: [MutationOperator; 5] = [
        MutationOperator::MethylAddition,
        MutationOperator::EthylAddition,
        MutationOperator::IsopropylAddition,
        MutationOperator::AtomTypeSubstitution,
        MutationOperator::HalogenExchange,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MutationOperator::MethylAddition => "methyl_addition",
            MutationOperator::EthylAddition => "ethyl_addition",
            MutationOperator::IsopropylAddition => "isopropyl_addition",
            MutationOperator::AtomTypeSubstitution => "atom_type_substitution",
            MutationOperator::HalogenExchange => "halogen_exchange",
        }
    }
}

impl fmt::Display for MutationOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of one mutation product.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LineageRecord {
    pub parent: String,
    pub child: String,
    #[serde(rename = "mutation")]
    pub operator: MutationOperator,
    pub generation: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn operator_names_match_serde_form() {
        for operator in MutationOperator::ALL {
            let json = serde_json::to_string(&operator).unwrap();
            assert_eq!(json, format!("\"{}\"", operator.as_str()));
        }
    }
}
