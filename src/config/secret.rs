use std::fmt;

use zeroize::{Zeroize, ZeroizeOnDrop};

/// A credential that is wiped from memory when dropped and never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow the raw value for an outgoing request header.
    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(\"***\")")
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for Secret {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_is_redacted() {
        let secret = Secret::new("sk-live-123");
        let printed = format!("{secret:?}");
        assert!(!printed.contains("sk-live-123"));
        assert_eq!(secret.expose(), "sk-live-123");
    }

    #[test]
    fn test_blank_counts_as_empty() {
        assert!(Secret::new("  ").is_empty());
        assert!(!Secret::from("k").is_empty());
    }

    #[test]
    fn test_zeroize_clears_value() {
        let mut secret = Secret::new("token");
        secret.zeroize();
        assert!(secret.expose().is_empty());
    }
}
