use std::fmt;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(raw: impl Into<String>) -> Self {
                Self(raw.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(raw: &str) -> Self {
                Self(raw.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(raw: String) -> Self {
                Self(raw)
            }
        }
    };
}

string_id!(UserId);
string_id!(PostId);
string_id!(CommentId);
string_id!(ReplyId);

/// Preview card payload for a single user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserPreview {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub introduction: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    #[serde(default)]
    pub is_follow: bool,
    #[serde(default)]
    pub like_count: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimpleUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub icon: Option<String>,
    #[serde(default)]
    pub is_followed: bool,
    #[serde(default)]
    pub being_followed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub id: PostId,
    #[serde(rename = "userVO")]
    pub author: SimpleUser,
    pub title: String,
    #[serde(default)]
    pub preview: Option<String>,
    #[serde(default)]
    pub content: String,
    pub like_count: i64,
    pub comment_count: i64,
    #[serde(default)]
    pub is_like: bool,
    #[serde(default)]
    pub is_creator: bool,
    #[serde(default)]
    pub created_at: String,
}

/// `status == 1` marks a soft-deleted comment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentRecord {
    pub id: CommentId,
    #[serde(rename = "userVO")]
    pub author: SimpleUser,
    pub post_id: PostId,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub is_like: bool,
    #[serde(default)]
    pub is_creator: bool,
    #[serde(default)]
    pub reply_count: i64,
    #[serde(default)]
    pub replies: Vec<ReplyRecord>,
    #[serde(default)]
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyTo {
    pub reply_id: ReplyId,
    pub user_id: UserId,
    pub user_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRecord {
    pub id: ReplyId,
    #[serde(rename = "userVO")]
    pub author: SimpleUser,
    pub comment_id: CommentId,
    #[serde(default, rename = "replyToVO")]
    pub reply_to: Option<ReplyTo>,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub status: u8,
    #[serde(default)]
    pub like_count: i64,
    #[serde(default)]
    pub is_like: bool,
    #[serde(default)]
    pub is_creator: bool,
    #[serde(default)]
    pub created_at: String,
}

pub(crate) const STATUS_DELETED: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum::Display)]
#[serde(into = "u8", try_from = "u8")]
#[strum(serialize_all = "lowercase")]
pub enum LikeKind {
    Post,
    Comment,
    Reply,
}

impl From<LikeKind> for u8 {
    fn from(kind: LikeKind) -> Self {
        match kind {
            LikeKind::Post => 1,
            LikeKind::Comment => 2,
            LikeKind::Reply => 3,
        }
    }
}

impl TryFrom<u8> for LikeKind {
    type Error = String;

    fn try_from(raw: u8) -> Result<Self, Self::Error> {
        match raw {
            1 => Ok(LikeKind::Post),
            2 => Ok(LikeKind::Comment),
            3 => Ok(LikeKind::Reply),
            other => Err(format!("unknown like target type {other}")),
        }
    }
}

/// Body of the like/unlike requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeTarget {
    pub target_type: LikeKind,
    pub target_id: String,
}

impl LikeTarget {
    pub fn post(id: &PostId) -> Self {
        Self {
            target_type: LikeKind::Post,
            target_id: id.as_str().to_owned(),
        }
    }

    pub fn comment(id: &CommentId) -> Self {
        Self {
            target_type: LikeKind::Comment,
            target_id: id.as_str().to_owned(),
        }
    }

    pub fn reply(id: &ReplyId) -> Self {
        Self {
            target_type: LikeKind::Reply,
            target_id: id.as_str().to_owned(),
        }
    }
}

impl fmt::Display for LikeTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.target_type, self.target_id)
    }
}
