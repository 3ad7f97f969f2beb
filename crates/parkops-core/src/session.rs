use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use parkops_proto::Operator;

/// Display language chosen by the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    En,
    Fr,
}

impl Locale {
    pub fn as_str(self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Fr => "fr",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" => Ok(Locale::En),
            "fr" => Ok(Locale::Fr),
            other => Err(format!("unsupported language '{other}' (expected en or fr)")),
        }
    }
}

/// An authenticated operator together with the bearer token issued at login.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub token: String,
    pub operator: Operator,
}

impl Session {
    pub fn new(token: impl Into<String>, operator: Operator) -> Self {
        Self {
            token: token.into(),
            operator,
        }
    }

    pub fn partition_key(&self) -> PartitionKey {
        PartitionKey::for_operator(&self.operator)
    }
}

/// Storage key under which one operator's missions live.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PartitionKey(String);

impl PartitionKey {
    /// `missions_<id>`, with any character outside `[A-Za-z0-9._-]` replaced
    /// by `_` so the key is valid for restrictive secure stores.
    pub fn for_operator(operator: &Operator) -> Self {
        let sanitized: String = operator
            .id
            .as_str()
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        Self(format!("missions_{sanitized}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_key_depends_only_on_operator_id() {
        let a = PartitionKey::for_operator(&Operator::new("17", "nadia"));
        let b = PartitionKey::for_operator(&Operator::new("17", "renamed"));
        let c = PartitionKey::for_operator(&Operator::new("18", "nadia"));
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_str(), "missions_17");
    }

    #[test]
    fn partition_key_is_sanitized() {
        let key = PartitionKey::for_operator(&Operator::new("ops/team a@x", "x"));
        assert_eq!(key.as_str(), "missions_ops_team_a_x");
    }

    #[test]
    fn locale_parsing() {
        assert_eq!("FR".parse::<Locale>().unwrap(), Locale::Fr);
        assert_eq!(" en ".parse::<Locale>().unwrap(), Locale::En);
        assert!("de".parse::<Locale>().is_err());
    }
}
