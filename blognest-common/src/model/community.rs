use crate::model::{
    Id,
    post::Post,
    user::{UserMarker, UserSummary},
};
use serde::{
    Deserialize, Deserializer, Serialize,
    de::{Error, Unexpected},
};
use std::fmt::Display;
use thiserror::Error;

pub const COMMUNITY_NAME_MAX_LEN: usize = 100;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct CommunityMarker;

/// A bare community row, admin unresolved.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Community {
    pub id: Id<CommunityMarker>,
    pub name: CommunityName,
    pub description: String,
    pub banner: String,
    pub category: String,
    pub admin_id: Id<UserMarker>,
    pub created_at: i64,
}

/// A community with admin, members, and posts resolved.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityDetail {
    pub id: Id<CommunityMarker>,
    pub name: CommunityName,
    pub description: String,
    pub banner: String,
    pub category: String,
    pub admin: UserSummary,
    pub members: Vec<UserSummary>,
    pub posts: Vec<Post>,
    pub created_at: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreateCommunity {
    pub name: CommunityName,
    pub description: String,
    pub banner: String,
    pub category: String,
}

/// A community ready for storage, with the creator attached as admin.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct NewCommunity {
    pub name: CommunityName,
    pub description: String,
    pub banner: String,
    pub category: String,
    pub admin: Id<UserMarker>,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Serialize)]
#[serde(transparent)]
pub struct CommunityName(String);

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash, Error)]
#[error("The community name is invalid: {0}")]
pub struct InvalidCommunityNameError(String);

impl CommunityName {
    pub fn new(name: String) -> Result<Self, InvalidCommunityNameError> {
        if !name.trim().is_empty() && name.chars().count() <= COMMUNITY_NAME_MAX_LEN {
            Ok(CommunityName(name))
        } else {
            Err(InvalidCommunityNameError(name))
        }
    }

    #[must_use]
    pub fn get(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Display for CommunityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for CommunityName {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let inner = String::deserialize(deserializer)?;
        CommunityName::new(inner)
            .map_err(|err| Error::invalid_value(Unexpected::Str(&err.0), &"CommunityName"))
    }
}

#[cfg(test)]
mod tests {
    use crate::model::community::CommunityName;

    #[test]
    fn community_name_validation() {
        let legal_names = ["rustaceans", "Systems Programming", "a"];
        let illegal_names = ["", "   "];

        for legal_name in legal_names {
            assert!(CommunityName::new(legal_name.to_owned()).is_ok());
        }
        for illegal_name in illegal_names {
            assert!(CommunityName::new(illegal_name.to_owned()).is_err());
        }

        assert!(CommunityName::new("n".repeat(100)).is_ok());
        assert!(CommunityName::new("n".repeat(101)).is_err());
    }
}
