use crate::model::{
    Id,
    community::{CommunityMarker, CommunityName},
    user::{UserMarker, UserSummary},
};
use serde::{Deserialize, Serialize};

/// Number of distinct reporters after which a post is marked invalid.
pub const REPORT_THRESHOLD: i64 = 10;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

/// A post with its author and community references resolved.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Id<PostMarker>,
    pub title: String,
    pub banner: String,
    pub content: String,
    pub tags: Vec<String>,
    pub author: UserSummary,
    pub community: Option<CommunityRef>,
    pub likes: i64,
    pub impressions: i64,
    pub report_count: i64,
    pub is_valid: bool,
    pub is_draft: bool,
    pub created_at: i64,
}

/// The community shape embedded in post payloads.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CommunityRef {
    pub id: Id<CommunityMarker>,
    pub name: CommunityName,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePost {
    pub title: String,
    pub banner: String,
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub community_id: Option<Id<CommunityMarker>>,
    #[serde(default)]
    pub is_draft: bool,
}

/// A post ready for storage, with the author attached and tags normalized.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct NewPost {
    pub title: String,
    pub banner: String,
    pub content: String,
    pub tags: Vec<String>,
    pub author: Id<UserMarker>,
    pub community: Option<Id<CommunityMarker>>,
    pub is_draft: bool,
}

/// Tags behave as a set: deduplicated, blank entries dropped, canonical order.
#[must_use]
pub fn normalize_tags(tags: Vec<String>) -> Vec<String> {
    let mut tags: Vec<String> = tags
        .into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .collect();
    tags.sort();
    tags.dedup();
    tags
}

#[cfg(test)]
mod tests {
    use crate::model::post::{Post, normalize_tags};

    #[test]
    fn tags_normalize_to_a_set() {
        assert_eq!(
            normalize_tags(vec!["b".to_owned(), "a".to_owned(), "b".to_owned()]),
            vec!["a".to_owned(), "b".to_owned()]
        );
        assert_eq!(
            normalize_tags(vec![" rust ".to_owned(), String::new(), "rust".to_owned()]),
            vec!["rust".to_owned()]
        );
        assert_eq!(normalize_tags(Vec::new()), Vec::<String>::new());
    }

    #[test]
    fn post_wire_field_names() {
        let json = serde_json::to_value(Post::default()).unwrap();
        let object = json.as_object().unwrap();

        for key in [
            "id",
            "title",
            "banner",
            "content",
            "tags",
            "author",
            "community",
            "likes",
            "impressions",
            "reportCount",
            "isValid",
            "isDraft",
            "createdAt",
        ] {
            assert!(object.contains_key(key), "missing key: {key}");
        }
    }
}
