//! The share permission bitmask.

use std::fmt;
use std::ops::{BitAnd, BitOr};

use serde::{Deserialize, Serialize};

/// Bitmask of capabilities granted by a share.
///
/// Stored as a plain integer in the share relation. A re-share may never
/// carry bits that its origin share does not carry, and file shares may
/// never carry [`CREATE`](Self::CREATE) or [`DELETE`](Self::DELETE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SharePermissions(pub i32);

impl SharePermissions {
    /// No capability at all. A zero-permission group override hides the
    /// share from its recipient.
    pub const NONE: Self = Self(0);
    /// Read the shared node.
    pub const READ: Self = Self(1);
    /// Modify the shared node's content.
    pub const UPDATE: Self = Self(2);
    /// Create entries below a shared folder.
    pub const CREATE: Self = Self(4);
    /// Delete the shared node or entries below it.
    pub const DELETE: Self = Self(8);
    /// Re-share the node.
    pub const SHARE: Self = Self(16);
    /// Every capability.
    pub const ALL: Self = Self(31);

    /// Build a mask from raw bits without validity checking; use
    /// [`is_valid`](Self::is_valid) to reject out-of-range input.
    pub fn from_bits(bits: i32) -> Self {
        Self(bits)
    }

    /// Return the raw bits.
    pub fn bits(&self) -> i32 {
        self.0
    }

    /// Whether the mask only carries defined bits.
    pub fn is_valid(&self) -> bool {
        self.0 >= 0 && self.0 <= Self::ALL.0
    }

    /// Whether no capability is granted.
    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Whether every bit of `other` is present in `self`.
    pub fn contains(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether at least one bit of `other` is present in `self`.
    pub fn intersects(&self, other: Self) -> bool {
        self.0 & other.0 != 0
    }

    /// Whether every bit of `self` is present in `other`.
    pub fn is_subset_of(&self, other: Self) -> bool {
        other.contains(*self)
    }

    /// The mask with the bits of `other` removed.
    pub fn without(&self, other: Self) -> Self {
        Self(self.0 & !other.0)
    }
}

impl Default for SharePermissions {
    fn default() -> Self {
        Self::READ
    }
}

impl BitOr for SharePermissions {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl BitAnd for SharePermissions {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Display for SharePermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(feature = "sqlx")]
impl sqlx::Type<sqlx::Postgres> for SharePermissions {
    fn type_info() -> sqlx::postgres::PgTypeInfo {
        <i32 as sqlx::Type<sqlx::Postgres>>::type_info()
    }
}

#[cfg(feature = "sqlx")]
impl<'q> sqlx::Encode<'q, sqlx::Postgres> for SharePermissions {
    fn encode_by_ref(
        &self,
        buf: &mut <sqlx::Postgres as sqlx::Database>::ArgumentBuffer<'q>,
    ) -> Result<sqlx::encode::IsNull, sqlx::error::BoxDynError> {
        <i32 as sqlx::Encode<'q, sqlx::Postgres>>::encode_by_ref(&self.0, buf)
    }
}

#[cfg(feature = "sqlx")]
impl<'r> sqlx::Decode<'r, sqlx::Postgres> for SharePermissions {
    fn decode(
        value: <sqlx::Postgres as sqlx::Database>::ValueRef<'r>,
    ) -> Result<Self, sqlx::error::BoxDynError> {
        <i32 as sqlx::Decode<'r, sqlx::Postgres>>::decode(value).map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_subset() {
        let read_share = SharePermissions::READ | SharePermissions::SHARE;
        assert!(read_share.is_subset_of(SharePermissions::ALL));
        assert!(!SharePermissions::ALL.is_subset_of(read_share));
        assert!(SharePermissions::NONE.is_subset_of(SharePermissions::NONE));
    }

    #[test]
    fn test_without() {
        let clamped = SharePermissions::ALL
            .without(SharePermissions::CREATE | SharePermissions::UPDATE);
        assert!(!clamped.intersects(SharePermissions::CREATE));
        assert!(!clamped.intersects(SharePermissions::UPDATE));
        assert!(clamped.contains(SharePermissions::READ));
        assert!(clamped.contains(SharePermissions::DELETE));
    }

    #[test]
    fn test_validity() {
        assert!(SharePermissions::ALL.is_valid());
        assert!(SharePermissions::NONE.is_valid());
        assert!(!SharePermissions::from_bits(32).is_valid());
        assert!(!SharePermissions::from_bits(-1).is_valid());
    }
}
