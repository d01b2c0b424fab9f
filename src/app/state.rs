use indexmap::IndexMap;

use crate::api::models::STATUS_DELETED;
use crate::api::{
    CommentId, CommentRecord, LikeKind, LikeTarget, PostId, PostRecord, ReplyId, ReplyRecord,
    ReplyTo, SimpleUser, UserId, UserPreview,
};
use crate::mutation::Rejected;

pub const COMMENT_TOMBSTONE: &str = "This comment has been deleted";
pub const REPLY_TOMBSTONE: &str = "This reply has been deleted";

/// Content of a comment or reply. Deletion is soft: the entry stays in its
/// list with a `Deleted` body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Active(String),
    Deleted,
}

impl Body {
    pub fn from_wire(content: String, status: u8) -> Self {
        if status == STATUS_DELETED {
            Body::Deleted
        } else {
            Body::Active(content)
        }
    }

    pub fn is_deleted(&self) -> bool {
        matches!(self, Body::Deleted)
    }

    pub fn text(&self) -> Option<&str> {
        match self {
            Body::Active(text) => Some(text),
            Body::Deleted => None,
        }
    }

    /// -1 when moving from active to deleted, +1 for the reverse.
    fn count_delta(from: &Body, to: &Body) -> i64 {
        i64::from(from.is_deleted()) - i64::from(to.is_deleted())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeCounter {
    pub liked: bool,
    pub count: i64,
}

impl LikeCounter {
    pub fn new(liked: bool, count: i64) -> Self {
        Self { liked, count }
    }

    pub(crate) fn apply(&mut self, from: bool, to: bool) {
        self.liked = to;
        self.count += i64::from(to) - i64::from(from);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PostView {
    pub id: PostId,
    pub author: SimpleUser,
    pub title: String,
    pub content: String,
    pub likes: LikeCounter,
    pub comment_count: i64,
    pub is_creator: bool,
    pub created_at: String,
}

impl From<PostRecord> for PostView {
    fn from(record: PostRecord) -> Self {
        Self {
            id: record.id,
            author: record.author,
            title: record.title,
            content: record.content,
            likes: LikeCounter::new(record.is_like, record.like_count),
            comment_count: record.comment_count,
            is_creator: record.is_creator,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReplyView {
    pub id: ReplyId,
    pub comment_id: CommentId,
    pub author: SimpleUser,
    pub reply_to: Option<ReplyTo>,
    pub body: Body,
    pub likes: LikeCounter,
    pub is_creator: bool,
    pub created_at: String,
}

impl ReplyView {
    pub fn display_text(&self) -> &str {
        self.body.text().unwrap_or(REPLY_TOMBSTONE)
    }
}

impl From<ReplyRecord> for ReplyView {
    fn from(record: ReplyRecord) -> Self {
        Self {
            id: record.id,
            comment_id: record.comment_id,
            author: record.author,
            reply_to: record.reply_to,
            body: Body::from_wire(record.content, record.status),
            likes: LikeCounter::new(record.is_like, record.like_count),
            is_creator: record.is_creator,
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentView {
    pub id: CommentId,
    pub author: SimpleUser,
    pub body: Body,
    pub likes: LikeCounter,
    pub reply_count: i64,
    pub replies: IndexMap<ReplyId, ReplyView>,
    pub is_creator: bool,
    pub created_at: String,
}

impl CommentView {
    pub fn display_text(&self) -> &str {
        self.body.text().unwrap_or(COMMENT_TOMBSTONE)
    }
}

impl From<CommentRecord> for CommentView {
    fn from(record: CommentRecord) -> Self {
        let replies = record
            .replies
            .into_iter()
            .map(|reply| (reply.id.clone(), ReplyView::from(reply)))
            .collect();
        Self {
            id: record.id,
            author: record.author,
            body: Body::from_wire(record.content, record.status),
            likes: LikeCounter::new(record.is_like, record.like_count),
            reply_count: record.reply_count,
            replies,
            is_creator: record.is_creator,
            created_at: record.created_at,
        }
    }
}

/// A post with its comments in display order (newest first).
#[derive(Debug, Clone, PartialEq)]
pub struct PostThread {
    pub post: PostView,
    pub comments: IndexMap<CommentId, CommentView>,
}

impl PostThread {
    pub fn new(post: PostRecord, comments: impl IntoIterator<Item = CommentRecord>) -> Self {
        let comments = comments
            .into_iter()
            .map(|comment| (comment.id.clone(), CommentView::from(comment)))
            .collect();
        Self {
            post: post.into(),
            comments,
        }
    }

    pub fn comment(&self, id: &CommentId) -> Option<&CommentView> {
        self.comments.get(id)
    }

    pub fn reply(&self, id: &ReplyId) -> Option<&ReplyView> {
        self.comments
            .values()
            .find_map(|comment| comment.replies.get(id))
    }

    /// New comments go to the top of the thread.
    pub fn add_comment(&mut self, record: CommentRecord) {
        let view = CommentView::from(record);
        self.comments.shift_insert(0, view.id.clone(), view);
        self.post.comment_count += 1;
    }

    pub fn add_reply(&mut self, record: ReplyRecord) -> Result<(), Rejected> {
        let comment = self
            .comments
            .get_mut(&record.comment_id)
            .ok_or(Rejected::UnknownTarget)?;
        if comment.body.is_deleted() {
            return Err(Rejected::Tombstoned);
        }
        let view = ReplyView::from(record);
        comment.replies.insert(view.id.clone(), view);
        comment.reply_count += 1;
        self.post.comment_count += 1;
        Ok(())
    }

    pub fn edit_comment(&mut self, id: &CommentId, content: impl Into<String>) -> Result<(), Rejected> {
        let comment = self.comments.get_mut(id).ok_or(Rejected::UnknownTarget)?;
        edit_body(&mut comment.body, content.into())
    }

    pub fn edit_reply(&mut self, id: &ReplyId, content: impl Into<String>) -> Result<(), Rejected> {
        let reply = self
            .comments
            .values_mut()
            .find_map(|comment| comment.replies.get_mut(id))
            .ok_or(Rejected::UnknownTarget)?;
        edit_body(&mut reply.body, content.into())
    }

    /// Deleting a comment only removes it from the post's count.
    pub(crate) fn write_comment_body(&mut self, id: &CommentId, from: &Body, to: &Body) {
        let Some(comment) = self.comments.get_mut(id) else {
            return;
        };
        comment.body = to.clone();
        self.post.comment_count += Body::count_delta(from, to);
    }

    pub(crate) fn write_reply_body(&mut self, id: &ReplyId, from: &Body, to: &Body) {
        let delta = Body::count_delta(from, to);
        let Some(comment) = self
            .comments
            .values_mut()
            .find(|comment| comment.replies.contains_key(id))
        else {
            return;
        };
        if let Some(reply) = comment.replies.get_mut(id) {
            reply.body = to.clone();
            comment.reply_count += delta;
            self.post.comment_count += delta;
        }
    }

    fn likes_mut(&mut self, target: &LikeTarget) -> Option<&mut LikeCounter> {
        match target.target_type {
            LikeKind::Post => {
                (self.post.id.as_str() == target.target_id).then_some(&mut self.post.likes)
            }
            LikeKind::Comment => self
                .comments
                .get_mut(&CommentId::new(target.target_id.as_str()))
                .map(|comment| &mut comment.likes),
            LikeKind::Reply => {
                let id = ReplyId::new(target.target_id.as_str());
                self.comments
                    .values_mut()
                    .find_map(|comment| comment.replies.get_mut(&id))
                    .map(|reply| &mut reply.likes)
            }
        }
    }
}

fn edit_body(body: &mut Body, content: String) -> Result<(), Rejected> {
    match body {
        Body::Active(text) => {
            *text = content;
            Ok(())
        }
        Body::Deleted => Err(Rejected::Tombstoned),
    }
}

/// The user card shown by the hover preview and on profile pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FollowCard {
    pub user_id: UserId,
    pub username: String,
    pub icon: Option<String>,
    pub introduction: Option<String>,
    pub follower_count: i64,
    pub following_count: i64,
    pub is_following: bool,
}

impl From<&UserPreview> for FollowCard {
    fn from(preview: &UserPreview) -> Self {
        Self {
            user_id: preview.id.clone(),
            username: preview.username.clone(),
            icon: preview.icon.clone(),
            introduction: preview.introduction.clone(),
            follower_count: preview.follower_count,
            following_count: preview.following_count,
            is_following: preview.is_follow,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterEntry {
    pub username: String,
    pub icon: Option<String>,
    pub is_followed: bool,
}

/// Follower or following list with a follow button per row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FollowRoster {
    pub entries: IndexMap<UserId, RosterEntry>,
}

impl FollowRoster {
    pub fn new(users: impl IntoIterator<Item = SimpleUser>) -> Self {
        let entries = users
            .into_iter()
            .map(|user| {
                (
                    user.id,
                    RosterEntry {
                        username: user.username,
                        icon: user.icon,
                        is_followed: user.is_followed,
                    },
                )
            })
            .collect();
        Self { entries }
    }
}

/// Anything that renders a follow button.
pub trait FollowSurface {
    /// `None` when `user` is not shown on this surface.
    fn is_following(&self, user: &UserId) -> Option<bool>;
    /// Moves the flag and any dependent counters from `from` to `to`.
    fn write_following(&mut self, user: &UserId, from: bool, to: bool);
    /// Overwrites the flag with server truth; counters are left alone.
    fn sync_following(&mut self, user: &UserId, following: bool);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeStatus {
    Live(bool),
    Tombstoned,
}

/// Anything that renders like buttons.
pub trait LikeSurface {
    fn like_status(&self, target: &LikeTarget) -> Option<LikeStatus>;
    fn write_liked(&mut self, target: &LikeTarget, from: bool, to: bool);
}

impl FollowSurface for FollowCard {
    fn is_following(&self, user: &UserId) -> Option<bool> {
        (&self.user_id == user).then_some(self.is_following)
    }

    fn write_following(&mut self, user: &UserId, from: bool, to: bool) {
        if &self.user_id != user {
            return;
        }
        self.is_following = to;
        self.follower_count += i64::from(to) - i64::from(from);
    }

    fn sync_following(&mut self, user: &UserId, following: bool) {
        if &self.user_id == user {
            self.is_following = following;
        }
    }
}

impl FollowSurface for FollowRoster {
    fn is_following(&self, user: &UserId) -> Option<bool> {
        self.entries.get(user).map(|entry| entry.is_followed)
    }

    fn write_following(&mut self, user: &UserId, _from: bool, to: bool) {
        if let Some(entry) = self.entries.get_mut(user) {
            entry.is_followed = to;
        }
    }

    fn sync_following(&mut self, user: &UserId, following: bool) {
        if let Some(entry) = self.entries.get_mut(user) {
            entry.is_followed = following;
        }
    }
}

impl LikeSurface for PostThread {
    fn like_status(&self, target: &LikeTarget) -> Option<LikeStatus> {
        let status = |body: &Body, likes: &LikeCounter| {
            if body.is_deleted() {
                LikeStatus::Tombstoned
            } else {
                LikeStatus::Live(likes.liked)
            }
        };
        match target.target_type {
            LikeKind::Post => (self.post.id.as_str() == target.target_id)
                .then_some(LikeStatus::Live(self.post.likes.liked)),
            LikeKind::Comment => self
                .comment(&CommentId::new(target.target_id.as_str()))
                .map(|comment| status(&comment.body, &comment.likes)),
            LikeKind::Reply => self
                .reply(&ReplyId::new(target.target_id.as_str()))
                .map(|reply| status(&reply.body, &reply.likes)),
        }
    }

    fn write_liked(&mut self, target: &LikeTarget, from: bool, to: bool) {
        if let Some(likes) = self.likes_mut(target) {
            likes.apply(from, to);
        }
    }
}

/// One toggle or delete button. At most one request per key is in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ControlKey {
    Follow(UserId),
    Like(LikeTarget),
    DeleteComment(CommentId),
    DeleteReply(ReplyId),
}
