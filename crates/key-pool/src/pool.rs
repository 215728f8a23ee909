//! Credential pool and rotation cursor
//!
//! The pool is an ordered, non-empty list of API keys plus a cursor shared by
//! every call made through one wrapped target. The list is fixed at
//! construction; only the cursor moves. Cursor updates go through an
//! `AtomicUsize`, so concurrent sessions never lose or double-apply an advance.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::Secret;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::error::{Error, Result};

/// One API key. Compared by value, redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(Secret<String>);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(Secret::new(value.into()))
    }

    /// The raw key, for injection into a request.
    pub fn expose(&self) -> &str {
        self.0.expose()
    }

    /// Last 4 characters, safe for logs.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.expose().chars().collect();
        if chars.len() <= 4 {
            return "****".to_string();
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("...{tail}")
    }

    /// First 8 hex characters of the key's SHA-256.
    ///
    /// Distinguishes keys that share a suffix without revealing either.
    pub fn fingerprint(&self) -> String {
        Sha256::digest(self.expose().as_bytes())
            .iter()
            .take(4)
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential").field(&self.masked()).finish()
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.masked())
    }
}

impl From<Secret<String>> for Credential {
    fn from(secret: Secret<String>) -> Self {
        Self(secret)
    }
}

impl From<&str> for Credential {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Credential {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// Keys supplied at wrap time: a single key or an ordered sequence.
#[derive(Debug, Clone)]
pub enum Keys {
    One(Credential),
    Many(Vec<Credential>),
}

impl Keys {
    /// Normalize to a sequence; a single key becomes a one-element list.
    pub fn into_vec(self) -> Vec<Credential> {
        match self {
            Keys::One(credential) => vec![credential],
            Keys::Many(credentials) => credentials,
        }
    }
}

impl From<&str> for Keys {
    fn from(value: &str) -> Self {
        Keys::One(Credential::new(value))
    }
}

impl From<String> for Keys {
    fn from(value: String) -> Self {
        Keys::One(Credential::new(value))
    }
}

impl From<Credential> for Keys {
    fn from(value: Credential) -> Self {
        Keys::One(value)
    }
}

impl From<Vec<Credential>> for Keys {
    fn from(value: Vec<Credential>) -> Self {
        Keys::Many(value)
    }
}

impl From<Vec<String>> for Keys {
    fn from(value: Vec<String>) -> Self {
        Keys::Many(value.into_iter().map(Credential::new).collect())
    }
}

impl From<Vec<&str>> for Keys {
    fn from(value: Vec<&str>) -> Self {
        Keys::Many(value.into_iter().map(Credential::new).collect())
    }
}

impl From<&[&str]> for Keys {
    fn from(value: &[&str]) -> Self {
        Keys::Many(value.iter().copied().map(Credential::new).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Keys {
    fn from(value: [&str; N]) -> Self {
        Keys::Many(value.into_iter().map(Credential::new).collect())
    }
}

impl From<Vec<Secret<String>>> for Keys {
    fn from(value: Vec<Secret<String>>) -> Self {
        Keys::Many(value.into_iter().map(Credential::from).collect())
    }
}

/// A slot index and the credential read from it.
#[derive(Debug, Clone)]
pub struct Lease {
    pub slot: usize,
    pub credential: Credential,
}

/// Ordered, cyclable collection of credentials with a shared cursor.
pub struct CredentialPool {
    credentials: Vec<Credential>,
    cursor: AtomicUsize,
}

impl CredentialPool {
    /// Build a pool. Order is kept verbatim and duplicates stay as separate
    /// slots. An empty sequence is a configuration error.
    pub fn new(keys: impl Into<Keys>) -> Result<Self> {
        let credentials = keys.into().into_vec();
        if credentials.is_empty() {
            return Err(Error::Configuration(
                "credential pool requires at least one API key".into(),
            ));
        }
        debug!(keys = credentials.len(), "credential pool initialized");
        Ok(Self {
            credentials,
            cursor: AtomicUsize::new(0),
        })
    }

    /// Number of credentials; bounds the attempts of one call.
    pub fn size(&self) -> usize {
        self.credentials.len()
    }

    /// Current cursor position.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire)
    }

    /// Credential at the cursor.
    pub fn current(&self) -> Credential {
        self.lease().credential
    }

    /// Cursor position and credential, read together.
    pub fn lease(&self) -> Lease {
        self.lease_at(self.cursor())
    }

    /// Credential at `slot` (taken modulo the pool size).
    pub fn lease_at(&self, slot: usize) -> Lease {
        let slot = slot % self.size();
        Lease {
            slot,
            credential: self.credentials[slot].clone(),
        }
    }

    /// Credential at `slot`, if in range.
    pub fn get(&self, slot: usize) -> Option<&Credential> {
        self.credentials.get(slot)
    }

    /// Move the cursor one step, wrapping. Returns the new current credential.
    pub fn advance(&self) -> Credential {
        let n = self.size();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| Some((c + 1) % n))
            .unwrap_or_else(|c| c);
        self.credentials[(previous + 1) % n].clone()
    }

    /// Move the cursor past `slot` only if it still points at `slot`.
    ///
    /// Sessions that failed on the same slot concurrently advance the shared
    /// cursor once, not once each. Returns the credential now at the cursor.
    pub fn advance_from(&self, slot: usize) -> Credential {
        let n = self.size();
        let next = (slot + 1) % n;
        match self
            .cursor
            .compare_exchange(slot, next, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => self.credentials[next].clone(),
            Err(actual) => {
                debug!(slot, cursor = actual, "cursor already advanced by another call");
                self.credentials[actual].clone()
            }
        }
    }
}

impl fmt::Debug for CredentialPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialPool")
            .field("size", &self.size())
            .field("cursor", &self.cursor())
            .finish()
    }
}
