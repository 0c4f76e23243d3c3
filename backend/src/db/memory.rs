//! In-process store with the same guarantees as [`super::PgStore`].
//!
//! The unique constraints become map keys and the conditional upserts become
//! per-key entry locks. A `matches` guard may be held while touching `users`,
//! `jobs`, `match_index` or `messages`, never the other way round.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use uuid::Uuid;

use super::store::{Directory, MatchStore, MessageStore, StoreResult, SwipeLedger};
use crate::models::{
    ApplicationStatus, Conversation, Identity, JobRef, Match, MatchStatus, MatchSummary, Message, MessageKind,
    PairKey, ProfileRef, Role, Swipe, SwipeCategory, SwipeDirection, Transition, UserCounters,
};

#[derive(Debug, Clone)]
struct UserRecord {
    role: Role,
    first_name: String,
    counters: UserCounters,
    last_swipe_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
struct JobRecord {
    job: JobRef,
    match_count: i32,
}

type SwipeKey = (Uuid, Uuid, SwipeCategory);

#[derive(Debug, Default)]
pub struct MemoryStore {
    users: DashMap<Uuid, UserRecord>,
    jobs: DashMap<Uuid, JobRecord>,
    profiles: DashMap<Uuid, ProfileRef>,
    swipes: DashMap<SwipeKey, Swipe>,
    matches: DashMap<PairKey, Match>,
    match_index: DashMap<Uuid, PairKey>,
    messages: DashMap<Uuid, Vec<Message>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user_id: Uuid, role: Role, first_name: &str) {
        self.users.insert(
            user_id,
            UserRecord {
                role,
                first_name: first_name.to_string(),
                counters: UserCounters::default(),
                last_swipe_date: None,
            },
        );
    }

    pub fn insert_job(&self, job: JobRef) {
        self.jobs.insert(job.id, JobRecord { job, match_count: 0 });
    }

    pub fn insert_profile(&self, profile: ProfileRef) {
        self.profiles.insert(profile.id, profile);
    }

    pub fn user_counters(&self, user_id: Uuid) -> UserCounters {
        self.users
            .get(&user_id)
            .map(|user| user.counters.clone())
            .unwrap_or_default()
    }

    pub fn user_role(&self, user_id: Uuid) -> Option<Role> {
        self.users.get(&user_id).map(|user| user.role)
    }

    pub fn last_swipe_date(&self, user_id: Uuid) -> Option<DateTime<Utc>> {
        self.users.get(&user_id).and_then(|user| user.last_swipe_date)
    }

    pub fn job_match_count(&self, job_id: Uuid) -> i32 {
        self.jobs.get(&job_id).map(|job| job.match_count).unwrap_or(0)
    }

    pub fn swipe_rows(&self) -> usize {
        self.swipes.len()
    }

    pub fn match_rows(&self) -> usize {
        self.matches.len()
    }

    fn name_of(&self, user_id: Uuid) -> String {
        self.users
            .get(&user_id)
            .map(|user| user.first_name.clone())
            .unwrap_or_default()
    }

    fn summarize(&self, record: Match) -> Option<MatchSummary> {
        let job = self.jobs.get(&record.job_id).map(|job| job.job.clone())?;
        Some(MatchSummary {
            job_seeker_name: self.name_of(record.job_seeker_id),
            recruiter_name: self.name_of(record.recruiter_id),
            record,
            job,
        })
    }

    fn conversation(&self, reader_id: Uuid, record: Match) -> Option<Conversation> {
        let job = self.jobs.get(&record.job_id).map(|job| job.job.clone())?;
        let other_user_id = record.counterpart_of(reader_id)?;
        let (last, unread_count) = self
            .messages
            .get(&record.id)
            .map(|messages| {
                let unread = messages
                    .iter()
                    .filter(|message| message.sender_id != reader_id && !message.is_read)
                    .count() as i64;
                (messages.last().cloned(), unread)
            })
            .unwrap_or((None, 0));

        Some(Conversation {
            match_id: record.id,
            other_user_id,
            other_user_name: self.name_of(other_user_id),
            job_title: job.title,
            company_name: job.company_name,
            unread_count,
            application_status: record.application_status,
            last_message_at: last.as_ref().map(|message| message.created_at),
            last_message: last.map(|message| message.content),
            matched_at: record.matched_at,
        })
    }

    fn is_party(row: &Match, identity: Identity) -> bool {
        match identity.role {
            Role::JobSeeker => row.job_seeker_id == identity.user_id,
            Role::Recruiter => row.recruiter_id == identity.user_id,
        }
    }

    fn key_of(&self, match_id: Uuid) -> Option<PairKey> {
        self.match_index.get(&match_id).map(|key| *key)
    }

    fn count_match(&self, job: &JobRef, job_seeker_id: Uuid) {
        for user_id in [job_seeker_id, job.recruiter_id] {
            if let Some(mut user) = self.users.get_mut(&user_id) {
                user.counters.total_matches += 1;
            }
        }
        if let Some(mut record) = self.jobs.get_mut(&job.id) {
            record.match_count += 1;
        }
    }

    fn new_row(job: &JobRef, job_seeker_id: Uuid, status: MatchStatus, now: DateTime<Utc>) -> Match {
        Match {
            id: Uuid::new_v4(),
            job_id: job.id,
            job_seeker_id,
            recruiter_id: job.recruiter_id,
            status,
            application_status: ApplicationStatus::Active,
            job_seeker_swiped_at: None,
            recruiter_swiped_at: None,
            matched_at: None,
            job_seeker_unread: 0,
            recruiter_unread: 0,
            last_activity_at: now,
            created_at: now,
            updated_at: now,
        }
    }
}

#[async_trait]
impl Directory for MemoryStore {
    async fn job(&self, job_id: Uuid) -> StoreResult<Option<JobRef>> {
        Ok(self.jobs.get(&job_id).map(|record| record.job.clone()))
    }

    async fn profile(&self, profile_id: Uuid) -> StoreResult<Option<ProfileRef>> {
        Ok(self.profiles.get(&profile_id).map(|profile| profile.clone()))
    }

    async fn profile_of_user(&self, user_id: Uuid) -> StoreResult<Option<ProfileRef>> {
        Ok(self
            .profiles
            .iter()
            .find(|profile| profile.user_id == user_id)
            .map(|profile| profile.clone()))
    }

    async fn first_name(&self, user_id: Uuid) -> StoreResult<Option<String>> {
        Ok(self.users.get(&user_id).map(|user| user.first_name.clone()))
    }
}

#[async_trait]
impl SwipeLedger for MemoryStore {
    async fn record_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
        direction: SwipeDirection,
    ) -> StoreResult<Swipe> {
        let now = Utc::now();
        let swipe = {
            let mut entry = self
                .swipes
                .entry((swiper_id, target_id, category))
                .or_insert_with(|| Swipe {
                    id: Uuid::new_v4(),
                    swiper_id,
                    target_id,
                    category,
                    direction,
                    created_at: now,
                    updated_at: now,
                });
            entry.direction = direction;
            entry.updated_at = now;
            entry.value().clone()
        };

        if let Some(mut user) = self.users.get_mut(&swiper_id) {
            user.counters.total_swipes += 1;
            user.last_swipe_date = Some(now);
        }

        Ok(swipe)
    }

    async fn find_swipe(
        &self,
        swiper_id: Uuid,
        target_id: Uuid,
        category: SwipeCategory,
    ) -> StoreResult<Option<Swipe>> {
        Ok(self
            .swipes
            .get(&(swiper_id, target_id, category))
            .map(|swipe| swipe.clone()))
    }

    async fn swipe_history(&self, swiper_id: Uuid, limit: i64) -> StoreResult<Vec<Swipe>> {
        let mut history: Vec<Swipe> = self
            .swipes
            .iter()
            .filter(|swipe| swipe.swiper_id == swiper_id)
            .map(|swipe| swipe.clone())
            .collect();
        history.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        history.truncate(limit.max(0) as usize);
        Ok(history)
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn find_pair(&self, key: PairKey) -> StoreResult<Option<Match>> {
        Ok(self.matches.get(&key).map(|row| row.clone()))
    }

    async fn upsert_pending(
        &self,
        job: &JobRef,
        job_seeker_id: Uuid,
        seeker_swiped_at: DateTime<Utc>,
    ) -> StoreResult<Match> {
        let key = PairKey::new(job.id, job_seeker_id);
        let row = match self.matches.entry(key) {
            Entry::Occupied(slot) => slot.get().clone(),
            Entry::Vacant(slot) => {
                let mut row = Self::new_row(job, job_seeker_id, MatchStatus::Pending, seeker_swiped_at);
                row.job_seeker_swiped_at = Some(seeker_swiped_at);
                self.match_index.insert(row.id, key);
                slot.insert(row.clone());
                row
            }
        };
        Ok(row)
    }

    async fn commit_match(
        &self,
        job: &JobRef,
        job_seeker_id: Uuid,
        seeker_swiped_at: DateTime<Utc>,
        recruiter_swiped_at: DateTime<Utc>,
    ) -> StoreResult<Transition> {
        let now = Utc::now();
        let key = PairKey::new(job.id, job_seeker_id);

        let transition = match self.matches.entry(key) {
            Entry::Vacant(slot) => {
                let mut row = Self::new_row(job, job_seeker_id, MatchStatus::Matched, now);
                row.job_seeker_swiped_at = Some(seeker_swiped_at);
                row.recruiter_swiped_at = Some(recruiter_swiped_at);
                row.matched_at = Some(now);
                self.match_index.insert(row.id, key);
                self.count_match(job, job_seeker_id);
                slot.insert(row.clone());
                Transition::Matched(row)
            }
            Entry::Occupied(mut slot) => {
                let row = slot.get_mut();
                match row.status {
                    MatchStatus::Pending => {
                        row.status = MatchStatus::Matched;
                        row.job_seeker_swiped_at = row.job_seeker_swiped_at.or(Some(seeker_swiped_at));
                        row.recruiter_swiped_at = Some(recruiter_swiped_at);
                        row.matched_at = Some(now);
                        row.last_activity_at = now;
                        row.updated_at = now;
                        self.count_match(job, job_seeker_id);
                        Transition::Matched(row.clone())
                    }
                    MatchStatus::Matched => Transition::AlreadyMatched(row.clone()),
                    MatchStatus::Unmatched => Transition::Terminal(row.clone()),
                }
            }
        };

        Ok(transition)
    }

    async fn reciprocal_job(
        &self,
        job_seeker_id: Uuid,
        recruiter_id: Uuid,
    ) -> StoreResult<Option<(JobRef, DateTime<Utc>)>> {
        let mut candidates: Vec<Swipe> = self
            .swipes
            .iter()
            .filter(|swipe| {
                swipe.swiper_id == job_seeker_id
                    && swipe.category == SwipeCategory::Job
                    && swipe.is_qualifying()
            })
            .map(|swipe| swipe.clone())
            .collect();
        candidates.sort_by_key(|swipe| swipe.created_at);

        let mut already_matched = None;
        for swipe in candidates {
            let Some(job) = self.jobs.get(&swipe.target_id).map(|record| record.job.clone()) else {
                continue;
            };
            if job.recruiter_id != recruiter_id {
                continue;
            }
            let status = self
                .matches
                .get(&PairKey::new(job.id, job_seeker_id))
                .map(|row| row.status);
            match status {
                Some(MatchStatus::Unmatched) => continue,
                Some(MatchStatus::Matched) => {
                    if already_matched.is_none() {
                        already_matched = Some((job, swipe.updated_at));
                    }
                }
                _ => return Ok(Some((job, swipe.updated_at))),
            }
        }

        Ok(already_matched)
    }

    async fn unmatch(&self, match_id: Uuid, requester_id: Uuid) -> StoreResult<Option<Match>> {
        let Some(key) = self.key_of(match_id) else {
            return Ok(None);
        };
        let Some(mut row) = self.matches.get_mut(&key) else {
            return Ok(None);
        };
        if !row.involves(requester_id) || row.status.is_terminal() {
            return Ok(None);
        }

        let now = Utc::now();
        row.status = MatchStatus::Unmatched;
        row.last_activity_at = now;
        row.updated_at = now;
        Ok(Some(row.clone()))
    }

    async fn match_for_party(
        &self,
        match_id: Uuid,
        user_id: Uuid,
    ) -> StoreResult<Option<MatchSummary>> {
        let Some(key) = self.key_of(match_id) else {
            return Ok(None);
        };
        let row = self.matches.get(&key).map(|row| row.clone());
        Ok(row
            .filter(|row| row.involves(user_id))
            .and_then(|row| self.summarize(row)))
    }

    async fn list_matches(&self, identity: Identity) -> StoreResult<Vec<MatchSummary>> {
        let rows: Vec<Match> = self
            .matches
            .iter()
            .filter(|row| row.status == MatchStatus::Matched && Self::is_party(row, identity))
            .map(|row| row.clone())
            .collect();

        let mut summaries: Vec<MatchSummary> =
            rows.into_iter().filter_map(|row| self.summarize(row)).collect();
        summaries.sort_by(|a, b| b.record.last_activity_at.cmp(&a.record.last_activity_at));
        Ok(summaries)
    }

    async fn update_application_status(
        &self,
        match_id: Uuid,
        recruiter_id: Uuid,
        status: ApplicationStatus,
        notice: &str,
    ) -> StoreResult<Option<MatchSummary>> {
        let Some(key) = self.key_of(match_id) else {
            return Ok(None);
        };
        let updated = {
            let Some(mut row) = self.matches.get_mut(&key) else {
                return Ok(None);
            };
            if row.recruiter_id != recruiter_id || row.status != MatchStatus::Matched {
                return Ok(None);
            }

            let now = Utc::now();
            row.application_status = status;
            row.job_seeker_unread += 1;
            row.last_activity_at = now;
            row.updated_at = now;
            self.messages.entry(match_id).or_default().push(Message {
                id: Uuid::new_v4(),
                match_id,
                sender_id: recruiter_id,
                kind: MessageKind::Status,
                content: notice.to_string(),
                is_read: false,
                read_at: None,
                created_at: now,
            });
            row.clone()
        };
        Ok(self.summarize(updated))
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert_message(
        &self,
        match_id: Uuid,
        sender_id: Uuid,
        kind: MessageKind,
        content: &str,
    ) -> StoreResult<Option<Message>> {
        let Some(key) = self.key_of(match_id) else {
            return Ok(None);
        };
        let Some(mut row) = self.matches.get_mut(&key) else {
            return Ok(None);
        };
        if row.status != MatchStatus::Matched || !row.involves(sender_id) {
            return Ok(None);
        }

        let now = Utc::now();
        if sender_id == row.recruiter_id {
            row.job_seeker_unread += 1;
        } else {
            row.recruiter_unread += 1;
        }
        row.last_activity_at = now;
        row.updated_at = now;

        let message = Message {
            id: Uuid::new_v4(),
            match_id,
            sender_id,
            kind,
            content: content.to_string(),
            is_read: false,
            read_at: None,
            created_at: now,
        };
        self.messages
            .entry(match_id)
            .or_default()
            .push(message.clone());

        Ok(Some(message))
    }

    async fn list_messages(
        &self,
        match_id: Uuid,
        reader_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> StoreResult<Option<Vec<Message>>> {
        let Some(key) = self.key_of(match_id) else {
            return Ok(None);
        };
        let is_party = self
            .matches
            .get(&key)
            .is_some_and(|row| row.involves(reader_id));
        if !is_party {
            return Ok(None);
        }

        let all = self
            .messages
            .get(&match_id)
            .map(|messages| messages.clone())
            .unwrap_or_default();
        let end = all.len().saturating_sub(offset.max(0) as usize);
        let start = end.saturating_sub(limit.max(0) as usize);
        Ok(Some(all[start..end].to_vec()))
    }

    async fn mark_read(&self, match_id: Uuid, reader_id: Uuid) -> StoreResult<Option<u64>> {
        let Some(key) = self.key_of(match_id) else {
            return Ok(None);
        };
        let Some(mut row) = self.matches.get_mut(&key) else {
            return Ok(None);
        };
        if !row.involves(reader_id) {
            return Ok(None);
        }
        if reader_id == row.job_seeker_id {
            row.job_seeker_unread = 0;
        } else {
            row.recruiter_unread = 0;
        }

        let now = Utc::now();
        let mut flipped = 0;
        if let Some(mut messages) = self.messages.get_mut(&match_id) {
            for message in messages.iter_mut() {
                if message.sender_id != reader_id && !message.is_read {
                    message.is_read = true;
                    message.read_at = Some(now);
                    flipped += 1;
                }
            }
        }

        Ok(Some(flipped))
    }

    async fn list_conversations(&self, reader: Identity) -> StoreResult<Vec<Conversation>> {
        let rows: Vec<Match> = self
            .matches
            .iter()
            .filter(|row| row.status == MatchStatus::Matched && Self::is_party(row, reader))
            .map(|row| row.clone())
            .collect();

        let mut conversations: Vec<Conversation> = rows
            .into_iter()
            .filter_map(|row| self.conversation(reader.user_id, row))
            .collect();
        conversations.sort_by(|a, b| b.activity_at().cmp(&a.activity_at()));
        Ok(conversations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(recruiter_id: Uuid) -> JobRef {
        JobRef {
            id: Uuid::new_v4(),
            recruiter_id,
            title: "Backend Engineer".to_string(),
            company_name: "Acme".to_string(),
        }
    }

    #[tokio::test]
    async fn reswipe_overwrites_direction_in_place() {
        let store = MemoryStore::new();
        let seeker = Uuid::new_v4();
        let target = Uuid::new_v4();
        store.insert_user(seeker, Role::JobSeeker, "Ada");

        let first = store
            .record_swipe(seeker, target, SwipeCategory::Job, SwipeDirection::Interested)
            .await
            .unwrap();
        let second = store
            .record_swipe(seeker, target, SwipeCategory::Job, SwipeDirection::Reject)
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(store.swipe_rows(), 1);
        assert!(!store
            .has_qualifying_swipe(seeker, target, SwipeCategory::Job)
            .await
            .unwrap());
        assert_eq!(store.user_counters(seeker).total_swipes, 2);
        assert_eq!(store.user_role(seeker), Some(Role::JobSeeker));
        assert!(store.last_swipe_date(seeker).is_some());
    }

    #[tokio::test]
    async fn same_target_in_other_category_is_a_separate_swipe() {
        let store = MemoryStore::new();
        let swiper = Uuid::new_v4();
        let target = Uuid::new_v4();

        store
            .record_swipe(swiper, target, SwipeCategory::Job, SwipeDirection::Interested)
            .await
            .unwrap();
        store
            .record_swipe(swiper, target, SwipeCategory::Profile, SwipeDirection::Interested)
            .await
            .unwrap();

        assert_eq!(store.swipe_rows(), 2);
    }

    #[tokio::test]
    async fn reciprocal_job_skips_unmatched_pairs() {
        let store = MemoryStore::new();
        let seeker = Uuid::new_v4();
        let recruiter = Uuid::new_v4();
        let first = job(recruiter);
        let second = job(recruiter);
        store.insert_job(first.clone());
        store.insert_job(second.clone());

        store
            .record_swipe(seeker, first.id, SwipeCategory::Job, SwipeDirection::Interested)
            .await
            .unwrap();
        store
            .record_swipe(seeker, second.id, SwipeCategory::Job, SwipeDirection::SuperInterested)
            .await
            .unwrap();
        let pending = store.upsert_pending(&first, seeker, Utc::now()).await.unwrap();
        store.unmatch(pending.id, seeker).await.unwrap();

        let (picked, _) = store.reciprocal_job(seeker, recruiter).await.unwrap().unwrap();
        assert_eq!(picked.id, second.id);
    }

    #[tokio::test]
    async fn unmatched_rows_never_advance() {
        let store = MemoryStore::new();
        let seeker = Uuid::new_v4();
        let listing = job(Uuid::new_v4());
        store.insert_job(listing.clone());

        let pending = store.upsert_pending(&listing, seeker, Utc::now()).await.unwrap();
        assert!(store.unmatch(pending.id, seeker).await.unwrap().is_some());
        // second unmatch finds nothing to move
        assert!(store.unmatch(pending.id, seeker).await.unwrap().is_none());

        let transition = store
            .commit_match(&listing, seeker, Utc::now(), Utc::now())
            .await
            .unwrap();
        assert!(matches!(transition, Transition::Terminal(row) if row.status == MatchStatus::Unmatched));
        assert_eq!(store.job_match_count(listing.id), 0);
    }

    #[tokio::test]
    async fn mark_read_resets_only_the_readers_side() {
        let store = MemoryStore::new();
        let seeker = Uuid::new_v4();
        let listing = job(Uuid::new_v4());
        store.insert_job(listing.clone());
        let Transition::Matched(row) = store
            .commit_match(&listing, seeker, Utc::now(), Utc::now())
            .await
            .unwrap()
        else {
            panic!("fresh pair should transition");
        };

        store
            .insert_message(row.id, seeker, MessageKind::Text, "hello")
            .await
            .unwrap()
            .unwrap();
        store
            .insert_message(row.id, listing.recruiter_id, MessageKind::Text, "hi there")
            .await
            .unwrap()
            .unwrap();

        let flipped = store.mark_read(row.id, seeker).await.unwrap();
        assert_eq!(flipped, Some(1));

        let current = store.find_pair(row.key()).await.unwrap().unwrap();
        assert_eq!(current.job_seeker_unread, 0);
        assert_eq!(current.recruiter_unread, 1);

        assert_eq!(store.mark_read(row.id, Uuid::new_v4()).await.unwrap(), None);
    }

    #[tokio::test]
    async fn status_change_and_notice_land_together() {
        let store = MemoryStore::new();
        let seeker = Uuid::new_v4();
        let listing = job(Uuid::new_v4());
        store.insert_job(listing.clone());
        let Transition::Matched(row) = store
            .commit_match(&listing, seeker, Utc::now(), Utc::now())
            .await
            .unwrap()
        else {
            panic!("fresh pair should transition");
        };

        let summary = store
            .update_application_status(
                row.id,
                listing.recruiter_id,
                ApplicationStatus::Offered,
                ApplicationStatus::Offered.chat_notice(),
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(summary.record.application_status, ApplicationStatus::Offered);
        assert_eq!(summary.record.job_seeker_unread, 1);

        let history = store.list_messages(row.id, seeker, 10, 0).await.unwrap().unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, MessageKind::Status);

        // once unmatched, neither the status nor the chat moves
        store.unmatch(row.id, seeker).await.unwrap().unwrap();
        let blocked = store
            .update_application_status(row.id, listing.recruiter_id, ApplicationStatus::Hired, "hired")
            .await
            .unwrap();
        assert!(blocked.is_none());
        let current = store.find_pair(row.key()).await.unwrap().unwrap();
        assert_eq!(current.application_status, ApplicationStatus::Offered);
        assert_eq!(store.list_messages(row.id, seeker, 10, 0).await.unwrap().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn conversations_follow_latest_activity() {
        let store = MemoryStore::new();
        let seeker = Identity::new(Uuid::new_v4(), Role::JobSeeker);
        let recruiter = Uuid::new_v4();
        store.insert_user(seeker.user_id, seeker.role, "Ada");
        store.insert_user(recruiter, Role::Recruiter, "Grace");
        let quiet = job(recruiter);
        let busy = job(recruiter);
        store.insert_job(quiet.clone());
        store.insert_job(busy.clone());

        store
            .commit_match(&busy, seeker.user_id, Utc::now(), Utc::now())
            .await
            .unwrap();
        let busy_row = store
            .find_pair(PairKey::new(busy.id, seeker.user_id))
            .await
            .unwrap()
            .unwrap();
        store
            .commit_match(&quiet, seeker.user_id, Utc::now(), Utc::now())
            .await
            .unwrap();

        store
            .insert_message(busy_row.id, recruiter, MessageKind::Text, "first")
            .await
            .unwrap()
            .unwrap();
        store
            .insert_message(busy_row.id, recruiter, MessageKind::Text, "second")
            .await
            .unwrap()
            .unwrap();
        store
            .insert_message(busy_row.id, seeker.user_id, MessageKind::Text, "mine")
            .await
            .unwrap()
            .unwrap();

        let inbox = store.list_conversations(seeker).await.unwrap();
        assert_eq!(inbox.len(), 2);
        assert_eq!(inbox[0].match_id, busy_row.id);
        assert_eq!(inbox[0].other_user_name, "Grace");
        assert_eq!(inbox[0].unread_count, 2);
        assert_eq!(inbox[0].last_message.as_deref(), Some("mine"));
        assert_eq!(inbox[1].unread_count, 0);
        assert!(inbox[1].last_message.is_none());
    }
}
