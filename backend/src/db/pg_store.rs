use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::store::{Directory, MatchStore, MessageStore, StoreResult, SwipeLedger};
use super::{directory, matches, messages, swipes};
use crate::models::{
    ApplicationStatus, Conversation, Identity, JobRef, Match, MatchSummary, Message, MessageKind, PairKey,
    ProfileRef, Swipe, SwipeCategory, SwipeDirection, Transition,
};

/// Postgres-backed store. The unique constraints on `swipes` and `matches`
/// provide the atomic upserts the match core relies on.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Directory for PgStore {
    async fn job(&self, job_id: Uuid) -> StoreResult<Option<JobRef>> {
        Ok(directory::get_job(&self.pool, job_id).await?)
    }

    async fn profile(&self, profile_id: Uuid) -> StoreResult<Option<ProfileRef>> {
        Ok(directory::get_profile(&self.pool, profile_id).await?)
    }

    async fn profile_of_user(&self, user_id: Uuid) -> StoreResult<Option<ProfileRef>> {
        Ok(directory::get_profile_by_user(&self.pool, user_id).await?)
    }

    async fn first_name(&self, user_id: Uuid) -> StoreResult<Option<String>> {
        Ok(directory::get_first_name(&self.pool, user_id).await?)
    }
}

#[async_trait]
impl SwipeLedger for PgStore {
    async fn record_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
        direction: SwipeDirection,
    ) -> StoreResult<Swipe> {
        Ok(swipes::record_swipe(&self.pool, swiper_id, target_id, category, direction).await?)
    }

    async fn find_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
    ) -> StoreResult<Option<Swipe>> {
        Ok(swipes::find_swipe(&self.pool, swiper_id, target_id, category).await?)
    }

    async fn swipe_history(&self, swiper_id: Uuid, limit: i64) -> StoreResult<Vec<Swipe>> {
        Ok(swipes::get_swipe_history(&self.pool, swiper_id, limit).await?)
    }
}

#[async_trait]
impl MatchStore for PgStore {
    async fn find_pair(&self, key: PairKey) -> StoreResult<Option<Match>> {
        Ok(matches::find_pair(&self.pool, key).await?)
    }

    async fn upsert_pending(
        &self,
        job: &JobRef,
        job_seeker_id: Uuid,
        seeker_swiped_at: DateTime<Utc>,
    ) -> StoreResult<Match> {
        Ok(matches::upsert_pending(&self.pool, job, job_seeker_id, seeker_swiped_at).await?)
    }

    async fn commit_match(
        &self,
        job: &JobRef,
        job_seeker_id: Uuid,
        seeker_swiped_at: DateTime<Utc>,
        recruiter_swiped_at: DateTime<Utc>,
    ) -> StoreResult<Transition> {
        Ok(matches::commit_match(
            &self.pool,
            job,
            job_seeker_id,
            seeker_swiped_at,
            recruiter_swiped_at,
        )
        .await?)
    }

    async fn reciprocal_job(
        &self,
        job_seeker_id: Uuid,
        recruiter_id: Uuid,
    ) -> StoreResult<Option<(JobRef, DateTime<Utc>)>> {
        Ok(matches::find_reciprocal_job(&self.pool, job_seeker_id, recruiter_id).await?)
    }

    async fn unmatch(&self, match_id: Uuid, requester_id: Uuid) -> StoreResult<Option<Match>> {
        Ok(matches::unmatch(&self.pool, match_id, requester_id).await?)
    }

    async fn match_for_party(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MatchSummary>> {
        Ok(matches::get_match_for_party(&self.pool, match_id, user_id).await?)
    }

    async fn list_matches(&self, identity: Identity) -> StoreResult<Vec<MatchSummary>> {
        Ok(matches::list_matches(&self.pool, identity).await?)
    }

    async fn update_application_status(
        &self,
        match_id: Uuid,
        recruiter_id: Uuid,
        status: ApplicationStatus,
        notice: &str,
    ) -> StoreResult<Option<MatchSummary>> {
        Ok(
            matches::update_application_status(&self.pool, match_id, recruiter_id, status, notice)
                .await?,
        )
    }
}

#[async_trait]
impl MessageStore for PgStore {
    async fn insert_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        kind: MessageKind,
        content: &str,
    ) -> StoreResult<Option<Message>> {
        Ok(messages::insert_message(&self.pool, match_id, sender_id, kind, content).await?)
    }

    async fn list_messages(
        &self,
        match_id: Uuid,
        reader_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Option<Vec<Message>>> {
        Ok(messages::list_messages(&self.pool, match_id, reader_id, limit, offset).await?)
    }

    async fn mark_read(&self, match_id: Uuid, reader_id: Uuid) -> StoreResult<Option<u64>> {
        Ok(messages::mark_read(&self.pool, match_id, reader_id).await?)
    }

    async fn list_conversations(&self, reader: Identity) -> StoreResult<Vec<Conversation>> {
        Ok(messages::list_conversations(&self.pool, reader).await?)
    }
}
