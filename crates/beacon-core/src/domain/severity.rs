//! Report severity.
//!
//! The ordinal is part of the contract: the prompt asks the model for a number
//! in `0..=3`, and thresholds elsewhere compare severities with `<`/`>`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Severity {
    Information = 0,
    Warning = 1,
    Error = 2,
    CriticalError = 3,
}

impl Severity {
    pub const ALL: [Severity; 4] = [
        Severity::Information,
        Severity::Warning,
        Severity::Error,
        Severity::CriticalError,
    ];

    pub fn ordinal(self) -> u8 {
        self as u8
    }

    pub fn from_ordinal(value: u64) -> Option<Self> {
        match value {
            0 => Some(Severity::Information),
            1 => Some(Severity::Warning),
            2 => Some(Severity::Error),
            3 => Some(Severity::CriticalError),
            _ => None,
        }
    }

    /// Accepts `"Error"`, `"critical_error"`, `"Critical Error"`, ...
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "information" | "info" => Some(Severity::Information),
            "warning" | "warn" => Some(Severity::Warning),
            "error" => Some(Severity::Error),
            "criticalerror" | "critical" => Some(Severity::CriticalError),
            _ => None,
        }
    }

    /// Label shown in generated admin comments.
    pub fn label(self) -> &'static str {
        match self {
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::CriticalError => "Critical error",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Severity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.ordinal())
    }
}

impl<'de> Deserialize<'de> for Severity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Ordinal(u64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Ordinal(n) => Severity::from_ordinal(n).ok_or_else(|| {
                serde::de::Error::custom(format!("severity out of range: {n} (expected 0..=3)"))
            }),
            Raw::Name(name) => Severity::from_name(&name).ok_or_else(|| {
                serde::de::Error::custom(format!("unknown severity name: {name}"))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn ordering_follows_ordinal() {
        assert!(Severity::Information < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::CriticalError);

        let mut shuffled = vec![Severity::Error, Severity::Information, Severity::CriticalError];
        shuffled.sort();
        assert_eq!(
            shuffled,
            vec![Severity::Information, Severity::Error, Severity::CriticalError]
        );
    }

    #[rstest]
    #[case("0", Severity::Information)]
    #[case("3", Severity::CriticalError)]
    #[case("\"Warning\"", Severity::Warning)]
    #[case("\"critical_error\"", Severity::CriticalError)]
    #[case("\"Critical Error\"", Severity::CriticalError)]
    fn deserializes_ordinal_or_name(#[case] json: &str, #[case] expected: Severity) {
        let severity: Severity = serde_json::from_str(json).unwrap();
        assert_eq!(severity, expected);
    }

    #[rstest]
    #[case("4")]
    #[case("-1")]
    #[case("\"fatal\"")]
    fn rejects_unknown_values(#[case] json: &str) {
        assert!(serde_json::from_str::<Severity>(json).is_err());
    }

    #[test]
    fn serializes_as_ordinal() {
        assert_eq!(serde_json::to_string(&Severity::Error).unwrap(), "2");
    }
}
