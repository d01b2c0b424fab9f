//! View state for posts, comments and user cards, and the interactions that
//! change it optimistically.

use crate::api::{ApiError, CommentId, LikeTarget, ReplyId, SocialApi, UserId};
use crate::mutation::{Mutation, OptimisticStore, Rejected, Settled};
use crate::notify::{NoticeKind, Notifier};
use crate::session::Session;

pub mod actions;
pub mod state;

pub use actions::ActionDispatcher;
pub use state::{
    Body, CommentView, ControlKey, FollowCard, FollowRoster, FollowSurface, LikeCounter,
    LikeStatus, LikeSurface, PostThread, PostView, ReplyView, RosterEntry, COMMENT_TOMBSTONE,
    REPLY_TOMBSTONE,
};

/// Store holding one rendered surface and its in-flight controls.
pub type SurfaceStore<S> = OptimisticStore<S, ControlKey>;

/// Follow, like and delete buttons wired to the network layer.
pub struct Interactions<A, N> {
    api: A,
    notifier: N,
    session: Session,
}

impl<A: SocialApi, N: Notifier> Interactions<A, N> {
    pub fn new(api: A, notifier: N, session: Session) -> Self {
        Self {
            api,
            notifier,
            session,
        }
    }

    pub fn dispatcher(&self) -> ActionDispatcher<'_, A> {
        ActionDispatcher::new(&self.api)
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub async fn toggle_follow<S: FollowSurface>(
        &self,
        store: &SurfaceStore<S>,
        user: &UserId,
    ) -> Result<Settled, Rejected> {
        let signed_in = self.session.is_signed_in();
        let is_self = self.session.is_self(user);
        let dispatcher = self.dispatcher();
        let settled = store
            .mutate(
                ControlKey::Follow(user.clone()),
                |surface| {
                    if !signed_in {
                        return Err(Rejected::SignedOut);
                    }
                    if is_self {
                        return Err(Rejected::SelfTarget);
                    }
                    let current = surface.is_following(user).ok_or(Rejected::UnknownTarget)?;
                    Ok(Mutation::toggle(current))
                },
                |surface, from, to| surface.write_following(user, *from, *to),
                |mutation| {
                    let follow = mutation.next;
                    let dispatcher = &dispatcher;
                    async move { dispatcher.set_following(user, follow).await }
                },
            )
            .await?;
        self.report_failure(&settled, "Failed to update follow status");
        Ok(settled)
    }

    pub async fn toggle_like<S: LikeSurface>(
        &self,
        store: &SurfaceStore<S>,
        target: &LikeTarget,
    ) -> Result<Settled, Rejected> {
        let signed_in = self.session.is_signed_in();
        let dispatcher = self.dispatcher();
        let settled = store
            .mutate(
                ControlKey::Like(target.clone()),
                |surface| {
                    if !signed_in {
                        return Err(Rejected::SignedOut);
                    }
                    match surface.like_status(target) {
                        None => Err(Rejected::UnknownTarget),
                        Some(LikeStatus::Tombstoned) => Err(Rejected::Tombstoned),
                        Some(LikeStatus::Live(liked)) => Ok(Mutation::toggle(liked)),
                    }
                },
                |surface, from, to| surface.write_liked(target, *from, *to),
                |mutation| {
                    let like = mutation.next;
                    let dispatcher = &dispatcher;
                    async move { dispatcher.set_liked(target, like).await }
                },
            )
            .await?;
        self.report_failure(&settled, "Failed to update like");
        Ok(settled)
    }

    pub async fn delete_comment(
        &self,
        store: &SurfaceStore<PostThread>,
        comment: &CommentId,
    ) -> Result<Settled, Rejected> {
        let signed_in = self.session.is_signed_in();
        let dispatcher = self.dispatcher();
        let settled = store
            .mutate(
                ControlKey::DeleteComment(comment.clone()),
                |thread| {
                    if !signed_in {
                        return Err(Rejected::SignedOut);
                    }
                    let view = thread.comment(comment).ok_or(Rejected::UnknownTarget)?;
                    tombstone(&view.body)
                },
                |thread, from, to| thread.write_comment_body(comment, from, to),
                |_| {
                    let dispatcher = &dispatcher;
                    async move { dispatcher.delete_comment(comment).await }
                },
            )
            .await?;
        self.report_delete(&settled, "Comment deleted", "Failed to delete comment");
        Ok(settled)
    }

    pub async fn delete_reply(
        &self,
        store: &SurfaceStore<PostThread>,
        reply: &ReplyId,
    ) -> Result<Settled, Rejected> {
        let signed_in = self.session.is_signed_in();
        let dispatcher = self.dispatcher();
        let settled = store
            .mutate(
                ControlKey::DeleteReply(reply.clone()),
                |thread| {
                    if !signed_in {
                        return Err(Rejected::SignedOut);
                    }
                    let view = thread.reply(reply).ok_or(Rejected::UnknownTarget)?;
                    tombstone(&view.body)
                },
                |thread, from, to| thread.write_reply_body(reply, from, to),
                |_| {
                    let dispatcher = &dispatcher;
                    async move { dispatcher.delete_reply(reply).await }
                },
            )
            .await?;
        self.report_delete(&settled, "Reply deleted", "Failed to delete reply");
        Ok(settled)
    }

    /// Re-reads the follow relationship after a card loads. Returns whether
    /// the server answer was applied; it is dropped if a toggle for the same
    /// user was in flight or began while the read was outstanding.
    pub async fn verify_follow<S: FollowSurface>(
        &self,
        store: &SurfaceStore<S>,
        user: &UserId,
    ) -> Result<bool, ApiError> {
        if !self.session.is_signed_in() || self.session.is_self(user) {
            return Ok(false);
        }
        let key = ControlKey::Follow(user.clone());
        let seen = store.epoch(&key);
        let following = self.dispatcher().check_follow(user).await?;
        let applied = store.reconcile(&key, seen, |surface| {
            surface.sync_following(user, following)
        });
        Ok(applied)
    }

    fn report_failure(&self, settled: &Settled, message: &str) {
        if let Settled::RolledBack(err) = settled {
            tracing::debug!(%err, "reporting failed interaction");
            self.notifier.notify(message, NoticeKind::Error);
        }
    }

    fn report_delete(&self, settled: &Settled, success: &str, failure: &str) {
        match settled {
            Settled::Committed => self.notifier.notify(success, NoticeKind::Success),
            Settled::RolledBack(_) => self.report_failure(settled, failure),
        }
    }
}

fn tombstone(body: &Body) -> Result<Mutation<Body>, Rejected> {
    match body {
        Body::Active(_) => Ok(Mutation::new(body.clone(), Body::Deleted)),
        Body::Deleted => Err(Rejected::Tombstoned),
    }
}

#[cfg(test)]
mod tests {
    use super::state::fixtures::thread;
    use super::*;
    use crate::api::testing::{preview, FakeApi, Reply};
    use crate::api::PostId;
    use crate::notify::testing::RecordingNotifier;
    use crate::session::CurrentUser;
    use assert_matches::assert_matches;
    use std::sync::Arc;

    fn signed_in_as(id: &str) -> Session {
        Session::signed_in(CurrentUser {
            id: UserId::new(id),
            username: id.to_owned(),
        })
    }

    type TestInteractions = Interactions<Arc<FakeApi>, Arc<RecordingNotifier>>;

    fn interactions(api: FakeApi) -> (TestInteractions, Arc<FakeApi>, Arc<RecordingNotifier>) {
        let api = Arc::new(api);
        let notifier = Arc::new(RecordingNotifier::default());
        let ui = Interactions::new(api.clone(), notifier.clone(), signed_in_as("me"));
        (ui, api, notifier)
    }

    fn card(followers: i64, following: bool) -> SurfaceStore<FollowCard> {
        OptimisticStore::new(FollowCard::from(&preview("u2", followers, following)))
    }

    #[tokio::test]
    async fn failed_follow_rolls_back_and_notifies() {
        let (ui, api, notifier) = interactions(FakeApi::failing(Reply::Status(500)));
        let store = card(10, false);
        let user = UserId::new("u2");

        let pending = ui.toggle_follow(&store, &user);
        let settled = pending.await;

        assert_matches!(settled, Ok(Settled::RolledBack(ApiError::Status { code: 500, .. })));
        assert_eq!(api.write_count(), 1);
        assert_eq!(store.read(|c| (c.is_following, c.follower_count)), (false, 10));
        assert_eq!(
            notifier.take(),
            vec![("Failed to update follow status".to_owned(), NoticeKind::Error)]
        );
    }

    #[tokio::test]
    async fn follow_shows_next_state_while_in_flight() {
        let (ui, _api, notifier) = interactions(FakeApi::new());
        let store = card(10, false);
        let user = UserId::new("u2");

        // polled while the fake backend is parked mid-request
        let observe = async { store.read(|c| (c.is_following, c.follower_count)) };
        let (settled, during) = tokio::join!(ui.toggle_follow(&store, &user), observe);

        assert_eq!(during, (true, 11));
        assert_eq!(settled, Ok(Settled::Committed));
        assert_eq!(store.read(|c| (c.is_following, c.follower_count)), (true, 11));
        assert!(notifier.take().is_empty());
    }

    #[tokio::test]
    async fn double_click_like_sends_one_request() {
        let (ui, api, _notifier) = interactions(FakeApi::new());
        let store = OptimisticStore::new(thread());
        let target = LikeTarget::post(&PostId::new("p1"));

        let (first, second) = tokio::join!(
            ui.toggle_like(&store, &target),
            ui.toggle_like(&store, &target)
        );

        assert_eq!(first, Ok(Settled::Committed));
        assert_eq!(second, Err(Rejected::InFlight));
        assert_eq!(api.write_count(), 1);
        assert_eq!(store.read(|t| t.post.likes), LikeCounter::new(true, 4));
    }

    #[tokio::test]
    async fn deleting_a_comment_tombstones_it_and_decrements_post_count() {
        let (ui, _api, notifier) = interactions(FakeApi::new());
        let store = OptimisticStore::new(thread());
        let id = CommentId::new("c2");

        let settled = ui.delete_comment(&store, &id).await;

        assert_eq!(settled, Ok(Settled::Committed));
        store.read(|t| {
            let comment = t.comment(&id).unwrap();
            assert_eq!(comment.display_text(), COMMENT_TOMBSTONE);
            assert_eq!(t.comments.len(), 2);
            assert_eq!(t.post.comment_count, 4);
        });
        assert_eq!(notifier.take(), vec![("Comment deleted".to_owned(), NoticeKind::Success)]);

        // a second delete of the same comment changes nothing
        assert_eq!(ui.delete_comment(&store, &id).await, Err(Rejected::Tombstoned));
        assert_eq!(store.read(|t| t.post.comment_count), 4);
    }

    #[tokio::test]
    async fn deleting_a_reply_adjusts_comment_and_post_counts() {
        let (ui, _api, _notifier) = interactions(FakeApi::new());
        let store = OptimisticStore::new(thread());

        ui.delete_reply(&store, &ReplyId::new("r1")).await.unwrap();

        store.read(|t| {
            let c1 = t.comment(&CommentId::new("c1")).unwrap();
            assert_eq!(c1.reply_count, 1);
            assert_eq!(c1.replies.len(), 2);
            assert_eq!(
                c1.replies.get(&ReplyId::new("r1")).map(|r| r.display_text()),
                Some(REPLY_TOMBSTONE)
            );
            assert_eq!(t.post.comment_count, 4);
        });
    }

    #[tokio::test]
    async fn failed_delete_restores_content_and_counts() {
        let (ui, _api, notifier) = interactions(FakeApi::failing(Reply::Transport));
        let store = OptimisticStore::new(thread());
        let before = store.snapshot();

        let settled = ui.delete_reply(&store, &ReplyId::new("r2")).await;

        assert_matches!(settled, Ok(Settled::RolledBack(ApiError::Transport(_))));
        assert_eq!(store.snapshot(), before);
        assert_eq!(
            notifier.take(),
            vec![("Failed to delete reply".to_owned(), NoticeKind::Error)]
        );
    }

    #[tokio::test]
    async fn likes_on_tombstones_are_rejected_without_a_request() {
        let (ui, api, _notifier) = interactions(FakeApi::new());
        let store = OptimisticStore::new(thread());
        ui.delete_comment(&store, &CommentId::new("c1")).await.unwrap();
        let writes = api.write_count();
        let before = store.snapshot();

        let result = ui
            .toggle_like(&store, &LikeTarget::comment(&CommentId::new("c1")))
            .await;

        assert_eq!(result, Err(Rejected::Tombstoned));
        assert_eq!(api.write_count(), writes);
        assert_eq!(store.snapshot(), before);
    }

    #[tokio::test]
    async fn follow_guards_session_and_self() {
        let api = Arc::new(FakeApi::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let session = Session::new();
        let ui = Interactions::new(api.clone(), notifier, session.clone());
        let store = card(10, false);
        let user = UserId::new("u2");

        assert_eq!(ui.toggle_follow(&store, &user).await, Err(Rejected::SignedOut));

        session.sign_in(CurrentUser {
            id: user.clone(),
            username: "u2".into(),
        });
        assert_eq!(ui.toggle_follow(&store, &user).await, Err(Rejected::SelfTarget));

        assert_eq!(
            ui.toggle_follow(&store, &UserId::new("elsewhere")).await,
            Err(Rejected::UnknownTarget)
        );
        assert_eq!(api.write_count(), 0);
        assert_eq!(store.read(|c| c.follower_count), 10);
    }

    #[tokio::test]
    async fn verify_follow_applies_server_truth_without_moving_counts() {
        let user = UserId::new("u2");
        let (ui, _api, _notifier) = interactions(FakeApi::new().with_follow_truth(&user, true));
        let store = card(10, false);

        assert_eq!(ui.verify_follow(&store, &user).await, Ok(true));
        assert_eq!(store.read(|c| (c.is_following, c.follower_count)), (true, 10));
    }

    #[tokio::test]
    async fn verify_follow_is_ignored_during_a_toggle() {
        let user = UserId::new("u2");
        let (ui, _api, _notifier) = interactions(FakeApi::new().with_follow_truth(&user, false));
        let store = card(10, false);

        let (toggled, verified) = tokio::join!(
            ui.toggle_follow(&store, &user),
            ui.verify_follow(&store, &user)
        );

        assert_eq!(toggled, Ok(Settled::Committed));
        assert_eq!(verified, Ok(false));
        assert_eq!(store.read(|c| (c.is_following, c.follower_count)), (true, 11));
    }

    #[tokio::test]
    async fn slow_verify_does_not_undo_a_toggle_that_started_later() {
        let user = UserId::new("u2");
        let api = FakeApi::new()
            .with_follow_truth(&user, false)
            .with_slow_reads(5);
        let (ui, api, _notifier) = interactions(api);
        let store = card(10, false);

        let (verified, toggled) = tokio::join!(
            ui.verify_follow(&store, &user),
            ui.toggle_follow(&store, &user)
        );

        assert_eq!(toggled, Ok(Settled::Committed));
        assert_eq!(verified, Ok(false));
        assert_eq!(api.read_count(), 1);
        assert_eq!(store.read(|c| (c.is_following, c.follower_count)), (true, 11));
    }

    #[tokio::test]
    async fn roster_toggle_leaves_other_rows_alone() {
        let (ui, _api, _notifier) = interactions(FakeApi::new());
        let store = OptimisticStore::new(FollowRoster::new(vec![
            state::fixtures::user("a"),
            state::fixtures::user("b"),
        ]));

        ui.toggle_follow(&store, &UserId::new("a")).await.unwrap();

        assert_eq!(store.read(|r| r.is_following(&UserId::new("a"))), Some(true));
        assert_eq!(store.read(|r| r.is_following(&UserId::new("b"))), Some(false));
    }
}
