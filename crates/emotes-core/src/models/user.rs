use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

/// Moderation rank, ordered from least to most privileged
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize, ToSchema,
)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[repr(i32)]
#[serde(rename_all = "lowercase")]
pub enum UserRank {
    #[default]
    Default = 0,
    Moderator = 1,
    Admin = 2,
}

/// Actor and channel owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct User {
    pub id: Uuid,
    pub display_name: String,
    pub rank: UserRank,
    /// Emotes enabled in this user's channel
    pub emotes: Vec<Uuid>,
}

impl User {
    pub fn is_moderator(&self) -> bool {
        self.rank >= UserRank::Moderator
    }

    /// Owner of the given emote, or a moderator
    pub fn can_manage(&self, owner: Uuid) -> bool {
        self.id == owner || self.is_moderator()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(rank: UserRank) -> User {
        User {
            id: Uuid::new_v4(),
            display_name: "someone".into(),
            rank,
            emotes: Vec::new(),
        }
    }

    #[test]
    fn test_rank_ordering() {
        assert!(UserRank::Admin > UserRank::Moderator);
        assert!(UserRank::Moderator > UserRank::Default);
        assert!(user(UserRank::Admin).is_moderator());
        assert!(!user(UserRank::Default).is_moderator());
    }

    #[test]
    fn test_can_manage() {
        let owner = user(UserRank::Default);
        let stranger = user(UserRank::Default);
        let moderator = user(UserRank::Moderator);
        assert!(owner.can_manage(owner.id));
        assert!(!stranger.can_manage(owner.id));
        assert!(moderator.can_manage(owner.id));
    }
}
