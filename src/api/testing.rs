use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    ApiError, ApiResponse, CommentId, LikeTarget, ReplyId, SocialApi, UserId, UserPreview,
};

/// How the fake backend answers a write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Reply {
    Ok,
    Status(i32),
    Transport,
}

/// In-memory backend used by unit tests. Every write yields once before
/// answering so concurrent callers can interleave on a single thread.
/// Follow checks yield as many times as set by `with_slow_reads`.
#[derive(Debug)]
pub(crate) struct FakeApi {
    pub writes: AtomicUsize,
    pub reads: AtomicUsize,
    read_yields: usize,
    reply: Mutex<Reply>,
    previews: Mutex<HashMap<UserId, UserPreview>>,
    follow_truth: Mutex<HashMap<UserId, bool>>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self {
            writes: AtomicUsize::new(0),
            reads: AtomicUsize::new(0),
            read_yields: 0,
            reply: Mutex::new(Reply::Ok),
            previews: Mutex::new(HashMap::new()),
            follow_truth: Mutex::new(HashMap::new()),
        }
    }

    pub fn failing(reply: Reply) -> Self {
        let api = Self::new();
        api.answer_with(reply);
        api
    }

    pub fn answer_with(&self, reply: Reply) {
        *self.reply.lock() = reply;
    }

    pub fn with_preview(self, preview: UserPreview) -> Self {
        self.previews.lock().insert(preview.id.clone(), preview);
        self
    }

    pub fn with_follow_truth(self, user: &UserId, following: bool) -> Self {
        self.follow_truth.lock().insert(user.clone(), following);
        self
    }

    pub fn with_slow_reads(mut self, yields: usize) -> Self {
        self.read_yields = yields;
        self
    }

    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn write<T>(&self, data: Option<T>) -> Result<ApiResponse<T>, ApiError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let reply = *self.reply.lock();
        match reply {
            Reply::Ok => Ok(ApiResponse {
                code: super::STATUS_OK,
                message: "success".into(),
                data,
            }),
            Reply::Status(code) => Ok(ApiResponse::failure(code, "rejected")),
            Reply::Transport => Err(ApiError::Transport("connection reset".into())),
        }
    }
}

pub(crate) fn preview(id: &str, followers: i64, is_follow: bool) -> UserPreview {
    UserPreview {
        id: UserId::new(id),
        username: format!("user-{id}"),
        icon: None,
        introduction: None,
        follower_count: followers,
        following_count: 1,
        is_follow,
        like_count: 0,
    }
}

#[async_trait]
impl SocialApi for FakeApi {
    async fn user_preview(&self, user: &UserId) -> Result<ApiResponse<UserPreview>, ApiError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        match self.previews.lock().get(user) {
            Some(preview) => Ok(ApiResponse::ok(preview.clone())),
            None => Ok(ApiResponse::failure(404, "no such user")),
        }
    }

    async fn follow(&self, _user: &UserId) -> Result<ApiResponse<()>, ApiError> {
        self.write(None).await
    }

    async fn unfollow(&self, _user: &UserId) -> Result<ApiResponse<()>, ApiError> {
        self.write(None).await
    }

    async fn check_follow(&self, user: &UserId) -> Result<ApiResponse<bool>, ApiError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        for _ in 0..self.read_yields {
            tokio::task::yield_now().await;
        }
        let truth = self.follow_truth.lock().get(user).copied().unwrap_or(false);
        Ok(ApiResponse::ok(truth))
    }

    async fn like(&self, _target: &LikeTarget) -> Result<ApiResponse<bool>, ApiError> {
        self.write(Some(true)).await
    }

    async fn unlike(&self, _target: &LikeTarget) -> Result<ApiResponse<bool>, ApiError> {
        self.write(Some(true)).await
    }

    async fn delete_comment(&self, _comment: &CommentId) -> Result<ApiResponse<bool>, ApiError> {
        self.write(Some(true)).await
    }

    async fn delete_reply(&self, _reply: &ReplyId) -> Result<ApiResponse<bool>, ApiError> {
        self.write(Some(true)).await
    }
}
