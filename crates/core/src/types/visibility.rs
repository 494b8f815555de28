//! Member wishlist visibility.

use serde::{Deserialize, Serialize};

/// Who can see a member's wishlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WishlistVisibility {
    /// Only the member themselves.
    #[default]
    Private,
    /// The member's friends.
    FriendsOnly,
    /// Anyone.
    Public,
}

impl std::fmt::Display for WishlistVisibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Private => write!(f, "private"),
            Self::FriendsOnly => write!(f, "friends_only"),
            Self::Public => write!(f, "public"),
        }
    }
}

impl std::str::FromStr for WishlistVisibility {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(Self::Private),
            "friends_only" => Ok(Self::FriendsOnly),
            "public" => Ok(Self::Public),
            _ => Err(format!("invalid wishlist visibility: {s}")),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_display_from_str_roundtrip() {
        for v in [
            WishlistVisibility::Private,
            WishlistVisibility::FriendsOnly,
            WishlistVisibility::Public,
        ] {
            let parsed: WishlistVisibility = v.to_string().parse().unwrap();
            assert_eq!(parsed, v);
        }
    }

    #[test]
    fn test_from_str_rejects_unknown() {
        assert!("everyone".parse::<WishlistVisibility>().is_err());
    }
}
