use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod models;
#[cfg(test)]
pub(crate) mod testing;

pub use models::{
    CommentId, CommentRecord, LikeKind, LikeTarget, PostId, PostRecord, ReplyId, ReplyRecord,
    ReplyTo, SimpleUser, UserId, UserPreview,
};

/// Status code the backend uses for a successful call.
pub const STATUS_OK: i32 = 200;

/// Envelope every backend endpoint answers with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub code: i32,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            code: STATUS_OK,
            message: "success".into(),
            data: Some(data),
        }
    }

    pub fn failure(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == STATUS_OK
    }

    /// Success requires both a 200 code and a payload.
    pub fn into_result(self) -> Result<T, ApiError> {
        if !self.is_success() {
            return Err(ApiError::Status {
                code: self.code,
                message: self.message,
            });
        }
        self.data.ok_or(ApiError::MissingPayload)
    }

    /// Like [`ApiResponse::into_result`] but the payload is irrelevant.
    pub fn into_ack(self) -> Result<(), ApiError> {
        if self.is_success() {
            Ok(())
        } else {
            Err(ApiError::Status {
                code: self.code,
                message: self.message,
            })
        }
    }
}

impl ApiResponse<()> {
    pub fn ack() -> Self {
        Self {
            code: STATUS_OK,
            message: "success".into(),
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    #[error("request rejected with status {code}: {message}")]
    Status { code: i32, message: String },
    #[error("response carried no payload")]
    MissingPayload,
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Network access layer. `Err` is reserved for transport-level failures;
/// backend-level failures come back as a non-200 envelope.
#[async_trait]
pub trait SocialApi: Send + Sync {
    async fn user_preview(&self, user: &UserId) -> Result<ApiResponse<UserPreview>, ApiError>;

    async fn follow(&self, user: &UserId) -> Result<ApiResponse<()>, ApiError>;

    async fn unfollow(&self, user: &UserId) -> Result<ApiResponse<()>, ApiError>;

    async fn check_follow(&self, user: &UserId) -> Result<ApiResponse<bool>, ApiError>;

    async fn like(&self, target: &LikeTarget) -> Result<ApiResponse<bool>, ApiError>;

    async fn unlike(&self, target: &LikeTarget) -> Result<ApiResponse<bool>, ApiError>;

    async fn delete_comment(&self, comment: &CommentId) -> Result<ApiResponse<bool>, ApiError>;

    async fn delete_reply(&self, reply: &ReplyId) -> Result<ApiResponse<bool>, ApiError>;
}

#[async_trait]
impl<T: SocialApi + ?Sized> SocialApi for Arc<T> {
    async fn user_preview(&self, user: &UserId) -> Result<ApiResponse<UserPreview>, ApiError> {
        (**self).user_preview(user).await
    }

    async fn follow(&self, user: &UserId) -> Result<ApiResponse<()>, ApiError> {
        (**self).follow(user).await
    }

    async fn unfollow(&self, user: &UserId) -> Result<ApiResponse<()>, ApiError> {
        (**self).unfollow(user).await
    }

    async fn check_follow(&self, user: &UserId) -> Result<ApiResponse<bool>, ApiError> {
        (**self).check_follow(user).await
    }

    async fn like(&self, target: &LikeTarget) -> Result<ApiResponse<bool>, ApiError> {
        (**self).like(target).await
    }

    async fn unlike(&self, target: &LikeTarget) -> Result<ApiResponse<bool>, ApiError> {
        (**self).unlike(target).await
    }

    async fn delete_comment(&self, comment: &CommentId) -> Result<ApiResponse<bool>, ApiError> {
        (**self).delete_comment(comment).await
    }

    async fn delete_reply(&self, reply: &ReplyId) -> Result<ApiResponse<bool>, ApiError> {
        (**self).delete_reply(reply).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn envelope_with_non_200_code_is_a_failure() {
        let raw = r#"{"code":500,"message":"boom","data":null}"#;
        let response: ApiResponse<UserPreview> = serde_json::from_str(raw).unwrap();
        assert_matches!(
            response.into_result(),
            Err(ApiError::Status { code: 500, ref message }) if message == "boom"
        );
    }

    #[test]
    fn envelope_without_payload_is_a_failure_for_reads() {
        let raw = r#"{"code":200,"message":"success","data":null}"#;
        let response: ApiResponse<UserPreview> = serde_json::from_str(raw).unwrap();
        assert_matches!(response.into_result(), Err(ApiError::MissingPayload));
    }

    #[test]
    fn envelope_without_payload_acknowledges_writes() {
        let raw = r#"{"code":200,"message":"success","data":null}"#;
        let response: ApiResponse<()> = serde_json::from_str(raw).unwrap();
        assert_eq!(response.into_ack(), Ok(()));
    }

    #[test]
    fn preview_envelope_parses_payload() {
        let raw = r#"{
            "code": 200,
            "message": "success",
            "data": {"id": "7", "username": "ada", "followerCount": 4, "followingCount": 2}
        }"#;
        let response: ApiResponse<UserPreview> = serde_json::from_str(raw).unwrap();
        let preview = response.into_result().unwrap();
        assert_eq!(preview.id, UserId::new("7"));
        assert_eq!(preview.follower_count, 4);
        assert!(!preview.is_follow);

        let missing: ApiResponse<UserPreview> = serde_json::from_str(r#"{"code":404}"#).unwrap();
        assert_eq!(missing.data, None);
        assert_matches!(missing.into_result(), Err(ApiError::Status { code: 404, .. }));
    }

    #[test]
    fn envelope_tolerates_missing_message_and_data() {
        let response: ApiResponse<bool> = serde_json::from_str(r#"{"code":401}"#).unwrap();
        assert!(!response.is_success());
        assert!(response.message.is_empty());
        assert_eq!(response.data, None);
    }
}
