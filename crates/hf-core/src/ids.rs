use core::fmt;
use core::num::NonZeroU32;
use core::str::FromStr;

use crate::HfError;

const SUB_PIPE_PREFIX: &str = "sub-pipe-";

/// Identifier of an outlet sub-pipe.
///
/// Stored as the 1-based pipe number so `Option<SubPipeId>` stays the size of
/// a `u32`. Rendered and parsed as `sub-pipe-N`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubPipeId(NonZeroU32);

impl SubPipeId {
    /// Create an id from a 0-based index by storing index+1.
    pub fn from_index(index: u32) -> Self {
        Self(NonZeroU32::MIN.saturating_add(index))
    }

    /// Create an id from its 1-based pipe number; `None` for zero.
    pub fn from_number(number: u32) -> Option<Self> {
        NonZeroU32::new(number).map(Self)
    }

    /// Recover the 0-based index.
    pub fn index(self) -> u32 {
        self.0.get() - 1
    }

    /// The 1-based pipe number.
    pub fn number(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Debug for SubPipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubPipeId({})", self.number())
    }
}

impl fmt::Display for SubPipeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SUB_PIPE_PREFIX}{}", self.number())
    }
}

impl FromStr for SubPipeId {
    type Err = HfError;

    /// Accepts `sub-pipe-N` or a bare `N` (1-based).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed.strip_prefix(SUB_PIPE_PREFIX).unwrap_or(trimmed);
        digits
            .parse::<u32>()
            .ok()
            .and_then(Self::from_number)
            .ok_or_else(|| HfError::InvalidSubPipeId { raw: s.to_owned() })
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for SubPipeId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for SubPipeId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
