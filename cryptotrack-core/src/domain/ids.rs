use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable numeric identifier of a strategy definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrategyId(pub u32);

impl fmt::Display for StrategyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Name of the party a ledger is simulated for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LedgerOwner(pub String);

impl LedgerOwner {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl Default for LedgerOwner {
    fn default() -> Self {
        Self("admin".to_string())
    }
}

impl fmt::Display for LedgerOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Content hash of a rebuilt signal + ledger sequence.
///
/// Two runs over unchanged inputs must produce the same digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunDigest(pub String);

impl RunDigest {
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(blake3::hash(bytes).to_hex().to_string())
    }
}

impl fmt::Display for RunDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = RunDigest::from_bytes(b"BUY,SELL");
        let b = RunDigest::from_bytes(b"BUY,SELL");
        let c = RunDigest::from_bytes(b"SELL,BUY");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.0.len(), 64);
    }

    #[test]
    fn default_owner_is_admin() {
        assert_eq!(LedgerOwner::default().to_string(), "admin");
    }
}
