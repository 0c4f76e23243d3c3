//! Storage seam for the match core.
//!
//! Every mutating method is a single atomic write against the backing store:
//! callers never read-then-write a match row from application code.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::MatchError;
use crate::models::{
    ApplicationStatus, Conversation, Identity, JobRef, Match, MatchSummary, Message, MessageKind,
    PairKey, ProfileRef, Swipe, SwipeCategory, SwipeDirection, Transition,
};

pub type StoreResult<T> = Result<T, MatchError>;

/// Counterpart resolution between the two swipe namespaces.
#[async_trait]
pub trait Directory: Send + Sync {
    async fn job(&self, job_id: Uuid) -> StoreResult<Option<JobRef>>;

    async fn profile(&self, profile_id: Uuid) -> StoreResult<Option<ProfileRef>>;

    /// The candidate profile owned by a job seeker.
    async fn profile_of_user(&self, user_id: Uuid) -> StoreResult<Option<ProfileRef>>;

    async fn first_name(&self, user_id: Uuid) -> StoreResult<Option<String>>;
}

/// One-directional interest signals, unique per (swiper, target, category).
#[async_trait]
pub trait SwipeLedger: Send + Sync {
    /// Idempotent upsert: a re-swipe overwrites the direction.
    async fn record_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
        direction: SwipeDirection,
    ) -> StoreResult<Swipe>;

    async fn find_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
    ) -> StoreResult<Option<Swipe>>;

    async fn has_qualifying_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
    ) -> StoreResult<bool> {
        Ok(self
            .find_swipe(swiper_id, target_id, category)
            .await?
            .is_some_and(|swipe| swipe.is_qualifying()))
    }

    async fn swipe_history(&self, swiper_id: Uuid, limit: i64) -> StoreResult<Vec<Swipe>>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn find_pair(&self, key: PairKey) -> StoreResult<Option<Match>>;

    /// Creates the pair in `pending` with the seeker's swipe time. Leaves an
    /// existing row untouched and returns it.
    async fn upsert_pending(
        &self,
        job: &JobRef,
        job_seeker_id: Uuid,
        seeker_swiped_at: DateTime<Utc>,
    ) -> StoreResult<Match>;

    /// Conditional upsert into `matched`, keyed on the pair. Only an absent or
    /// `pending` row advances; exactly one concurrent caller observes
    /// [`Transition::Matched`]. Both users' match counters and the job's
    /// match counter move in the same commit as the transition.
    async fn commit_match(
        &self,
        job: &JobRef,
        job_seeker_id: Uuid,
        seeker_swiped_at: DateTime<Utc>,
        recruiter_swiped_at: DateTime<Utc>,
    ) -> StoreResult<Transition>;

    /// The job of `recruiter_id` the seeker showed interest in first, among
    /// pairs that are not already unmatched. Returns the seeker's swipe time.
    async fn reciprocal_job(
        &self,
        job_seeker_id: Uuid,
        recruiter_id: Uuid,
    ) -> StoreResult<Option<(JobRef, DateTime<Utc>)>>;

    /// Moves a `pending` or `matched` row the requester belongs to into
    /// `unmatched`. `None` when no such row exists.
    async fn unmatch(&self, match_id: Uuid, requester_id: Uuid) -> StoreResult<Option<Match>>;

    async fn match_for_party(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MatchSummary>>;

    /// `matched` rows of a user, most recent activity first.
    async fn list_matches(&self, identity: Identity) -> StoreResult<Vec<MatchSummary>>;

    /// Sets the application status of a `matched` row owned by the recruiter
    /// and posts `notice` into its chat as a status message, in one commit.
    /// The seeker's unread counter moves with the notice.
    async fn update_application_status(
        &self,
        match_id: Uuid,
        recruiter_id: Uuid,
        status: ApplicationStatus,
        notice: &str,
    ) -> StoreResult<Option<MatchSummary>>;
}

#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Stores a message on a `matched` row the sender belongs to, bumping the
    /// recipient's unread counter and the row's last activity in the same
    /// write. `None` when the sender has no such match.
    async fn insert_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        kind: MessageKind,
        content: &str,
    ) -> StoreResult<Option<Message>>;

    /// Oldest first. `None` when the reader is not a party of the match.
    async fn list_messages(
        &self,
        match_id: Uuid,
        reader_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Option<Vec<Message>>>;

    /// Marks the counterpart's messages read and resets the reader's unread
    /// counter. Returns how many messages flipped, `None` when not a party.
    async fn mark_read(&self, match_id: Uuid, reader_id: Uuid) -> StoreResult<Option<u64>>;

    /// The reader's `matched` pairs, most recent message (or match) first.
    async fn list_conversations(&self, reader: Identity) -> StoreResult<Vec<Conversation>>;
}

/// Everything the service needs from storage.
pub trait Store: Directory + SwipeLedger + MatchStore + MessageStore {}

impl<T> Store for T where T: Directory + SwipeLedger + MatchStore + MessageStore {}
