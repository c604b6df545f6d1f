//! Account identifiers and user profiles
//!
//! The platform identifies a user by a 128-bit account uid. The overlay keys
//! credentials by the uid's stable string form `"<hi>:<lo>"`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// Prefix the platform puts in a nickname when the profile lookup failed
pub const PROFILE_ERROR_MARKER: &str = "ERR#";

/// 128-bit account identifier, stored as two halves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountUid(pub [u64; 2]);

impl AccountUid {
    /// Create a uid from its two halves
    pub fn new(hi: u64, lo: u64) -> Self {
        Self([hi, lo])
    }

    /// A uid is valid when at least one half is non-zero
    pub fn is_valid(&self) -> bool {
        self.0[0] != 0 || self.0[1] != 0
    }
}

impl fmt::Display for AccountUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.0[0], self.0[1])
    }
}

impl FromStr for AccountUid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (hi, lo) = s
            .split_once(':')
            .ok_or_else(|| CoreError::InvalidUid(s.to_string()))?;

        let hi = hi
            .parse::<u64>()
            .map_err(|_| CoreError::InvalidUid(s.to_string()))?;
        let lo = lo
            .parse::<u64>()
            .map_err(|_| CoreError::InvalidUid(s.to_string()))?;

        Ok(Self([hi, lo]))
    }
}

impl Serialize for AccountUid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AccountUid {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// The user an authentication panel is shown for
#[derive(Debug, Clone, Default)]
pub struct UserProfile {
    /// Account identifier
    pub uid: AccountUid,
    /// Display name
    pub nickname: String,
}

impl UserProfile {
    /// Create a profile
    pub fn new(uid: AccountUid, nickname: impl Into<String>) -> Self {
        Self {
            uid,
            nickname: nickname.into(),
        }
    }

    /// Whether the profile came from a successful lookup
    pub fn is_valid(&self) -> bool {
        self.uid.is_valid() && !self.nickname.starts_with(PROFILE_ERROR_MARKER)
    }

    /// Reset to the empty (invalid) profile
    pub fn clear(&mut self) {
        self.uid = AccountUid::default();
        self.nickname.clear();
    }
}

// Profiles are the same user when their uids match, whatever the nickname
impl PartialEq for UserProfile {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl Eq for UserProfile {}
