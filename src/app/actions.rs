use crate::api::{
    ApiError, CommentId, LikeTarget, ReplyId, SocialApi, UserId, UserPreview,
};

/// Calls into the network layer and flattens each envelope to a plain result.
pub struct ActionDispatcher<'a, A> {
    api: &'a A,
}

impl<'a, A: SocialApi> ActionDispatcher<'a, A> {
    pub fn new(api: &'a A) -> Self {
        Self { api }
    }

    pub async fn set_following(&self, user: &UserId, follow: bool) -> Result<(), ApiError> {
        let response = if follow {
            self.api.follow(user).await?
        } else {
            self.api.unfollow(user).await?
        };
        response.into_ack()
    }

    pub async fn set_liked(&self, target: &LikeTarget, like: bool) -> Result<(), ApiError> {
        let response = if like {
            self.api.like(target).await?
        } else {
            self.api.unlike(target).await?
        };
        response.into_ack()
    }

    pub async fn delete_comment(&self, comment: &CommentId) -> Result<(), ApiError> {
        self.api.delete_comment(comment).await?.into_ack()
    }

    pub async fn delete_reply(&self, reply: &ReplyId) -> Result<(), ApiError> {
        self.api.delete_reply(reply).await?.into_ack()
    }

    pub async fn fetch_preview(&self, user: &UserId) -> Result<UserPreview, ApiError> {
        self.api.user_preview(user).await?.into_result()
    }

    pub async fn check_follow(&self, user: &UserId) -> Result<bool, ApiError> {
        self.api.check_follow(user).await?.into_result()
    }
}
