//! Content digest parsing and computation.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::fmt;

/// A parsed content digest in `algo:hex` form.
///
/// The textual form is the source of truth on the wire and in link
/// files; blob keys are derived from the split components.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Digest {
    algo: String,
    hex: String,
}

impl Digest {
    /// Parse a textual digest such as `sha256:2cf24d...`.
    pub fn parse(s: &str) -> crate::Result<Self> {
        let (algo, hex) = s
            .split_once(':')
            .ok_or_else(|| crate::Error::InvalidDigest(format!("missing ':' in {s:?}")))?;
        if algo.is_empty() {
            return Err(crate::Error::InvalidDigest("empty algorithm".to_string()));
        }
        // The blob key layout shards on the first two hex characters.
        if hex.len() < 2 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(crate::Error::InvalidDigest(format!(
                "invalid hex component in {s:?}"
            )));
        }
        Ok(Self {
            algo: algo.to_string(),
            hex: hex.to_ascii_lowercase(),
        })
    }

    /// Compute the SHA-256 digest of a byte slice.
    pub fn from_bytes(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        let hex: String = hasher.finalize().iter().map(|b| format!("{b:02x}")).collect();
        Self {
            algo: "sha256".to_string(),
            hex,
        }
    }

    /// The algorithm component (e.g. `sha256`).
    pub fn algorithm(&self) -> &str {
        &self.algo
    }

    /// The lowercase hex component.
    pub fn hex(&self) -> &str {
        &self.hex
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.algo, self.hex)
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({}:{}…)", self.algo, &self.hex[..self.hex.len().min(12)])
    }
}

impl std::str::FromStr for Digest {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Digest {
    type Error = crate::Error;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Digest> for String {
    fn from(d: Digest) -> Self {
        d.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_roundtrip() {
        let d = Digest::parse("sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
            .unwrap();
        assert_eq!(d.algorithm(), "sha256");
        assert_eq!(&d.hex()[..2], "2c");
        assert_eq!(
            d.to_string(),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn parse_rejects_missing_colon() {
        assert!(Digest::parse("2cf24dba").is_err());
    }

    #[test]
    fn parse_rejects_short_hex() {
        assert!(Digest::parse("sha256:a").is_err());
        assert!(Digest::parse("sha256:zz00").is_err());
    }

    #[test]
    fn from_bytes_matches_known_vector() {
        // sha256("hello")
        let d = Digest::from_bytes(b"hello");
        assert_eq!(
            d.to_string(),
            "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }

    #[test]
    fn uppercase_hex_is_normalized() {
        let d = Digest::parse("sha256:ABCDEF01").unwrap();
        assert_eq!(d.hex(), "abcdef01");
    }
}
