//! Validation limits for changesets received from untrusted peers.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ValidationConfig {
    /// Reject changesets that are not byte-identical to their canonical
    /// re-assembly.
    pub require_canonical: bool,
    /// Maximum length in bytes of the whole changeset string.
    pub max_changeset_len: Option<usize>,
    /// Maximum number of chars in the char bank.
    pub max_bank_len: Option<usize>,
    /// Maximum number of ops.
    pub max_ops: Option<usize>,
    /// Maximum number of attribute numbers on a single op.
    pub max_attribs_per_op: Option<usize>,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            require_canonical: true,
            max_changeset_len: None,
            max_bank_len: None,
            max_ops: None,
            max_attribs_per_op: None,
        }
    }
}

impl ValidationConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let cfg = ValidationConfig::from_json(r#"{"max_ops": 64}"#).unwrap();
        assert!(cfg.require_canonical);
        assert_eq!(cfg.max_ops, Some(64));
        assert_eq!(cfg.max_bank_len, None);
    }

    #[test]
    fn loads_from_toml() {
        let cfg: ValidationConfig = toml::from_str(
            "require_canonical = false\nmax_changeset_len = 4096\nmax_attribs_per_op = 8\n",
        )
        .unwrap();
        assert_eq!(
            cfg,
            ValidationConfig {
                require_canonical: false,
                max_changeset_len: Some(4096),
                max_attribs_per_op: Some(8),
                ..ValidationConfig::default()
            }
        );
    }

    #[test]
    fn unknown_fields_are_rejected() {
        assert!(ValidationConfig::from_json(r#"{"max_opz": 1}"#).is_err());
    }
}
