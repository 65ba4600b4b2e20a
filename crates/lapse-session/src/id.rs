//! Session identifier generation.

use std::fmt;
use std::ops::Deref;

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::TryRngCore;
use rand::rngs::OsRng;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Number of random bytes behind each identifier (256 bits).
pub const ID_BYTES: usize = 32;

/// Opaque, unguessable session identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the identifier, returning the inner string.
    pub fn into_string(self) -> String {
        self.0
    }
}

impl Deref for SessionId {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of random bytes for identifier generation.
pub trait EntropySource: Send + Sync + 'static {
    /// Fill `dest` with random bytes, or describe why that was impossible.
    fn try_fill(&self, dest: &mut [u8]) -> std::result::Result<(), String>;
}

/// Entropy from the operating system's CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsEntropy;

impl EntropySource for OsEntropy {
    fn try_fill(&self, dest: &mut [u8]) -> std::result::Result<(), String> {
        OsRng.try_fill_bytes(dest).map_err(|e| e.to_string())
    }
}

/// Generate a fresh identifier from `entropy`.
pub fn generate(entropy: &dyn EntropySource) -> Result<SessionId> {
    let mut bytes = [0u8; ID_BYTES];
    entropy
        .try_fill(&mut bytes)
        .map_err(Error::IdentifierGeneration)?;
    Ok(SessionId(URL_SAFE_NO_PAD.encode(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Broken;

    impl EntropySource for Broken {
        fn try_fill(&self, _dest: &mut [u8]) -> std::result::Result<(), String> {
            Err("entropy pool unavailable".to_string())
        }
    }

    #[test]
    fn test_generate_is_url_safe() {
        let id = generate(&OsEntropy).unwrap();
        // 32 bytes -> 43 base64 chars without padding
        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_unique() {
        let ids: HashSet<SessionId> = (0..1_000).map(|_| generate(&OsEntropy).unwrap()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn test_entropy_failure() {
        let err = generate(&Broken).unwrap_err();
        assert!(matches!(err, Error::IdentifierGeneration(ref msg) if msg.contains("unavailable")));
    }

    #[test]
    fn test_session_id_serializes_as_string() {
        let id = generate(&OsEntropy).unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }
}
