//! Naming of collections and document keys.

use serde::{Deserialize, Serialize};

/// Maps a type or field name to a collection name or document key.
///
/// Implemented by [`KeyCase`] and by any `Fn(&str) -> String` closure.
pub trait KeyMapper: Send + Sync {
    /// Returns the storage name for `name`.
    fn map_key(&self, name: &str) -> String;
}

/// Built-in key mappers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyCase {
    /// `unitPrice` becomes `UNITPRICE`, `Order` becomes `ORDER`.
    #[default]
    Upper,
    /// `unitPrice` becomes `unitprice`.
    Lower,
    /// Names are used unchanged.
    Verbatim,
}

impl KeyMapper for KeyCase {
    fn map_key(&self, name: &str) -> String {
        match self {
            KeyCase::Upper => name.to_uppercase(),
            KeyCase::Lower => name.to_lowercase(),
            KeyCase::Verbatim => name.to_string(),
        }
    }
}

impl<F> KeyMapper for F
where
    F: Fn(&str) -> String + Send + Sync,
{
    fn map_key(&self, name: &str) -> String {
        self(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_cases() {
        assert_eq!(KeyCase::Upper.map_key("quantity"), "QUANTITY");
        assert_eq!(KeyCase::Lower.map_key("unitPrice"), "unitprice");
        assert_eq!(KeyCase::Verbatim.map_key("unitPrice"), "unitPrice");
    }

    #[test]
    fn closures_are_mappers() {
        let snake = |name: &str| format!("f_{name}");
        assert_eq!(snake.map_key("total"), "f_total");
    }

    #[test]
    fn key_case_serde() {
        let case: KeyCase = serde_json::from_str("\"verbatim\"").unwrap();
        assert_eq!(case, KeyCase::Verbatim);
    }
}
