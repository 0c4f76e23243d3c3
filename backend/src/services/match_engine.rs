use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use super::hub::{Delivery, Hub};
use crate::constants::{MATCH_NOTIFICATION_TEXT, SWIPE_HISTORY_LIMIT};
use crate::db::Store;
use crate::error::MatchError;
use crate::models::{
    ApplicationStatus, Event, Identity, JobRef, Match, MatchEvent, MatchStatus, MatchSummary,
    PairKey, Role, StatusUpdateEvent, Swipe, SwipeCategory, SwipeDirection, SwipeOutcome,
    Transition,
};

/// Swipe entry point: ledger write, reciprocal lookup, match transition and
/// notification, in that order.
#[derive(Clone)]
pub struct MatchEngine {
    store: Arc<dyn Store>,
    hub: Hub,
}

impl MatchEngine {
    pub fn new(store: Arc<dyn Store>, hub: Hub) -> Self {
        Self { store, hub }
    }

    pub async fn swipe(
        &self,
        swiper: Identity,
        target_id: Uuid,
        category: Option<SwipeCategory>,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome, MatchError> {
        let expected = swiper.role.swipe_category();
        if let Some(requested) = category
            && requested != expected
        {
            return Err(MatchError::Validation(format!(
                "a {} swipes on {} cards, not {}",
                swiper.role,
                expected.as_str(),
                requested.as_str()
            )));
        }

        match swiper.role {
            Role::JobSeeker => self.seeker_swipe(swiper.user_id, target_id, direction).await,
            Role::Recruiter => self.recruiter_swipe(swiper.user_id, target_id, direction).await,
        }
    }

    async fn seeker_swipe(
        &self,
        seeker_id: Uuid,
        job_id: Uuid,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome, MatchError> {
        let job = self
            .store
            .job(job_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("job {}", job_id)))?;

        if let Some(existing) = self.store.find_pair(PairKey::new(job.id, seeker_id)).await?
            && existing.status.is_terminal()
        {
            return Err(MatchError::Conflict(format!(
                "match {} was unmatched and cannot be revived",
                existing.id
            )));
        }

        let swipe = self
            .store
            .record_swipe(seeker_id, job.id, SwipeCategory::Job, direction)
            .await?;
        if !swipe.is_qualifying() {
            return Ok(SwipeOutcome::no_match());
        }

        let recruiter_swipe = match self.store.profile_of_user(seeker_id).await? {
            Some(profile) => self
                .store
                .find_swipe(job.recruiter_id, profile.id, SwipeCategory::Profile)
                .await?
                .filter(Swipe::is_qualifying),
            None => None,
        };

        let Some(recruiter_swipe) = recruiter_swipe else {
            let row = self.store.upsert_pending(&job, seeker_id, swipe.updated_at).await?;
            debug!(match_id = %row.id, status = row.status.as_str(), "seeker side recorded");
            if row.status == MatchStatus::Matched {
                return Ok(SwipeOutcome::matched(self.summarize(row, job).await?));
            }
            return Ok(SwipeOutcome::no_match());
        };

        let transition = self
            .store
            .commit_match(&job, seeker_id, swipe.updated_at, recruiter_swipe.updated_at)
            .await?;
        self.settle(transition, job, seeker_id).await
    }

    async fn recruiter_swipe(
        &self,
        recruiter_id: Uuid,
        profile_id: Uuid,
        direction: SwipeDirection,
    ) -> Result<SwipeOutcome, MatchError> {
        let profile = self
            .store
            .profile(profile_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("profile {}", profile_id)))?;

        let swipe = self
            .store
            .record_swipe(recruiter_id, profile.id, SwipeCategory::Profile, direction)
            .await?;
        if !swipe.is_qualifying() {
            return Ok(SwipeOutcome::no_match());
        }

        let Some((job, seeker_swiped_at)) = self
            .store
            .reciprocal_job(profile.user_id, recruiter_id)
            .await?
        else {
            debug!(%recruiter_id, seeker_id = %profile.user_id, "no reciprocal job swipe yet");
            return Ok(SwipeOutcome::no_match());
        };

        let transition = self
            .store
            .commit_match(&job, profile.user_id, seeker_swiped_at, swipe.updated_at)
            .await?;
        self.settle(transition, job, recruiter_id).await
    }

    /// Turns a committed transition into the caller's result. Only the
    /// writer that performed the transition notifies.
    async fn settle(
        &self,
        transition: Transition,
        job: JobRef,
        swiper_id: Uuid,
    ) -> Result<SwipeOutcome, MatchError> {
        match transition {
            Transition::Matched(record) => {
                info!(
                    match_id = %record.id,
                    job_id = %record.job_id,
                    job_seeker_id = %record.job_seeker_id,
                    recruiter_id = %record.recruiter_id,
                    "match formed"
                );
                self.notify_match(&record, &job, swiper_id);
                Ok(SwipeOutcome::matched(self.summarize(record, job).await?))
            }
            Transition::AlreadyMatched(record) => {
                debug!(match_id = %record.id, "pair already matched");
                Ok(SwipeOutcome::matched(self.summarize(record, job).await?))
            }
            Transition::Terminal(record) => {
                debug!(match_id = %record.id, "pair was unmatched concurrently");
                Ok(SwipeOutcome::no_match())
            }
        }
    }

    async fn summarize(&self, record: Match, job: JobRef) -> Result<MatchSummary, MatchError> {
        let job_seeker_name = self
            .store
            .first_name(record.job_seeker_id)
            .await?
            .unwrap_or_default();
        let recruiter_name = self
            .store
            .first_name(record.recruiter_id)
            .await?
            .unwrap_or_default();
        Ok(MatchSummary {
            record,
            job,
            job_seeker_name,
            recruiter_name,
        })
    }

    /// Counterpart first, then the swiper.
    fn notify_match(&self, record: &Match, job: &JobRef, swiper_id: Uuid) {
        let event = Event::Match(MatchEvent {
            match_id: record.id,
            job_id: job.id,
            job_title: job.title.clone(),
            company_name: job.company_name.clone(),
            message: MATCH_NOTIFICATION_TEXT.to_string(),
        });

        let mut recipients = Vec::with_capacity(2);
        if let Some(counterpart) = record.counterpart_of(swiper_id) {
            recipients.push(counterpart);
        }
        recipients.push(swiper_id);

        let deliveries = self.hub.send_to_many(&recipients, &event);
        for (user_id, delivery) in recipients.iter().zip(deliveries) {
            if delivery != Delivery::Queued {
                debug!(%user_id, ?delivery, match_id = %record.id, "match event not queued");
            }
        }
    }

    /// Terminal for the pair. `NotFound` covers rows the requester does not
    /// belong to and rows that are already unmatched.
    pub async fn unmatch(&self, match_id: Uuid, requester_id: Uuid) -> Result<Match, MatchError> {
        let record = self
            .store
            .unmatch(match_id, requester_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {}", match_id)))?;
        info!(%match_id, %requester_id, "match unmatched");
        Ok(record)
    }

    pub async fn set_application_status(
        &self,
        recruiter: Identity,
        match_id: Uuid,
        status: ApplicationStatus,
    ) -> Result<MatchSummary, MatchError> {
        if recruiter.role != Role::Recruiter {
            return Err(MatchError::Forbidden(
                "only recruiters can change an application status".to_string(),
            ));
        }

        let summary = self
            .store
            .update_application_status(match_id, recruiter.user_id, status, status.chat_notice())
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {}", match_id)))?;

        self.hub.send_to(
            summary.record.job_seeker_id,
            &Event::StatusUpdate(StatusUpdateEvent {
                match_id,
                job_title: summary.job.title.clone(),
                new_status: status,
            }),
        );
        info!(%match_id, status = status.as_str(), "application status updated");
        Ok(summary)
    }

    pub async fn matches(&self, identity: Identity) -> Result<Vec<MatchSummary>, MatchError> {
        self.store.list_matches(identity).await
    }

    pub async fn match_for(&self, match_id: Uuid, user_id: Uuid) -> Result<MatchSummary, MatchError> {
        self.store
            .match_for_party(match_id, user_id)
            .await?
            .ok_or_else(|| MatchError::NotFound(format!("match {}", match_id)))
    }

    pub async fn swipe_history(&self, swiper_id: Uuid) -> Result<Vec<Swipe>, MatchError> {
        self.store.swipe_history(swiper_id, SWIPE_HISTORY_LIMIT).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{MatchStore, MemoryStore, MessageStore, SwipeLedger};
    use crate::models::{MessageKind, ProfileRef};
    use crate::services::session::SessionHandle;
    use tokio::sync::mpsc;

    struct Market {
        store: Arc<MemoryStore>,
        hub: Hub,
        engine: MatchEngine,
        seeker: Identity,
        recruiter: Identity,
        job: JobRef,
        profile: ProfileRef,
    }

    fn market() -> Market {
        let store = Arc::new(MemoryStore::new());
        let hub = Hub::new();
        let seeker = Identity::new(Uuid::new_v4(), Role::JobSeeker);
        let recruiter = Identity::new(Uuid::new_v4(), Role::Recruiter);
        let job = JobRef {
            id: Uuid::new_v4(),
            recruiter_id: recruiter.user_id,
            title: "Backend Engineer".to_string(),
            company_name: "Acme".to_string(),
        };
        let profile = ProfileRef {
            id: Uuid::new_v4(),
            user_id: seeker.user_id,
        };
        store.insert_user(seeker.user_id, seeker.role, "Ada");
        store.insert_user(recruiter.user_id, recruiter.role, "Grace");
        store.insert_job(job.clone());
        store.insert_profile(profile.clone());

        let engine = MatchEngine::new(store.clone(), hub.clone());
        Market {
            store,
            hub,
            engine,
            seeker,
            recruiter,
            job,
            profile,
        }
    }

    fn connect(hub: &Hub, user_id: Uuid) -> mpsc::Receiver<String> {
        let (handle, queue) = SessionHandle::new(hub.next_session_id(), user_id, 16);
        hub.register(handle);
        queue
    }

    fn event_types(queue: &mut mpsc::Receiver<String>) -> Vec<serde_json::Value> {
        let mut events = Vec::new();
        while let Ok(frame) = queue.try_recv() {
            events.push(serde_json::from_str(&frame).unwrap());
        }
        events
    }

    #[tokio::test]
    async fn seeker_then_recruiter_forms_a_match() {
        let m = market();
        let mut recruiter_queue = connect(&m.hub, m.recruiter.user_id);
        let mut seeker_queue = connect(&m.hub, m.seeker.user_id);

        let first = m
            .engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        assert!(!first.is_match);
        let row = m
            .store
            .find_pair(PairKey::new(m.job.id, m.seeker.user_id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, MatchStatus::Pending);
        assert!(row.job_seeker_swiped_at.is_some());
        assert!(event_types(&mut recruiter_queue).is_empty());

        let second = m
            .engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        assert!(second.is_match);
        let summary = second.summary.unwrap();
        assert_eq!(summary.record.status, MatchStatus::Matched);
        assert_eq!(summary.record.id, row.id);
        assert!(summary.record.matched_at.is_some());
        assert_eq!(summary.job_seeker_name, "Ada");
        assert_eq!(summary.recruiter_name, "Grace");

        let recruiter_events = event_types(&mut recruiter_queue);
        assert_eq!(recruiter_events.len(), 1);
        assert_eq!(recruiter_events[0]["type"], "match");
        assert_eq!(recruiter_events[0]["payload"]["job_title"], "Backend Engineer");

        let seeker_events = event_types(&mut seeker_queue);
        assert_eq!(seeker_events.len(), 1);
        assert_eq!(seeker_events[0]["payload"]["match_id"], row.id.to_string());

        assert_eq!(m.store.user_counters(m.seeker.user_id).total_matches, 1);
        assert_eq!(m.store.user_counters(m.recruiter.user_id).total_matches, 1);
        assert_eq!(m.store.job_match_count(m.job.id), 1);
    }

    #[tokio::test]
    async fn recruiter_first_is_promoted_by_the_seeker() {
        let m = market();

        let first = m
            .engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::SuperInterested)
            .await
            .unwrap();
        assert!(!first.is_match);
        assert_eq!(m.store.match_rows(), 0);

        let second = m
            .engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        assert!(second.is_match);
        assert_eq!(second.summary.unwrap().job.company_name, "Acme");
    }

    #[tokio::test]
    async fn reject_never_touches_match_rows() {
        let m = market();
        m.engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::Interested)
            .await
            .unwrap();

        let outcome = m
            .engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Reject)
            .await
            .unwrap();
        assert!(!outcome.is_match);
        assert_eq!(m.store.match_rows(), 0);
        assert_eq!(m.store.swipe_rows(), 2);
    }

    #[tokio::test]
    async fn repeated_match_is_not_recounted_or_renotified() {
        let m = market();
        m.engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        m.engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::Interested)
            .await
            .unwrap();

        let mut recruiter_queue = connect(&m.hub, m.recruiter.user_id);
        let again = m
            .engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::SuperInterested)
            .await
            .unwrap();

        assert!(again.is_match);
        assert!(event_types(&mut recruiter_queue).is_empty());
        assert_eq!(m.store.user_counters(m.recruiter.user_id).total_matches, 1);
        assert_eq!(m.store.job_match_count(m.job.id), 1);
    }

    #[tokio::test]
    async fn unmatched_pair_is_absorbing() {
        let m = market();
        m.engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        let matched = m
            .engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::Interested)
            .await
            .unwrap()
            .summary
            .unwrap();

        let record = m
            .engine
            .unmatch(matched.record.id, m.seeker.user_id)
            .await
            .unwrap();
        assert_eq!(record.status, MatchStatus::Unmatched);
        let before = m
            .store
            .find_swipe(m.seeker.user_id, m.job.id, SwipeCategory::Job)
            .await
            .unwrap()
            .unwrap();
        let swipes_before = m.store.user_counters(m.seeker.user_id).total_swipes;

        let reswipe = m
            .engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::SuperInterested)
            .await;
        assert!(matches!(reswipe, Err(MatchError::Conflict(_))));

        // the rejected re-swipe leaves the ledger row as it was
        let after = m
            .store
            .find_swipe(m.seeker.user_id, m.job.id, SwipeCategory::Job)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.direction, SwipeDirection::Interested);
        assert_eq!(after.updated_at, before.updated_at);
        assert_eq!(after, before);
        assert_eq!(m.store.user_counters(m.seeker.user_id).total_swipes, swipes_before);

        let recruiter_again = m
            .engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        assert!(!recruiter_again.is_match);

        let second_unmatch = m.engine.unmatch(matched.record.id, m.recruiter.user_id).await;
        assert!(matches!(second_unmatch, Err(MatchError::NotFound(_))));
        assert_eq!(m.store.user_counters(m.seeker.user_id).total_matches, 1);
    }

    #[tokio::test]
    async fn outsiders_cannot_unmatch() {
        let m = market();
        m.engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        let row = m
            .store
            .find_pair(PairKey::new(m.job.id, m.seeker.user_id))
            .await
            .unwrap()
            .unwrap();

        let result = m.engine.unmatch(row.id, Uuid::new_v4()).await;
        assert!(matches!(result, Err(MatchError::NotFound(_))));
    }

    #[tokio::test]
    async fn wrong_category_and_unknown_targets_are_rejected() {
        let m = market();

        let wrong = m
            .engine
            .swipe(m.seeker, m.job.id, Some(SwipeCategory::Profile), SwipeDirection::Interested)
            .await;
        assert!(matches!(wrong, Err(MatchError::Validation(_))));

        let missing = m
            .engine
            .swipe(m.recruiter, Uuid::new_v4(), None, SwipeDirection::Interested)
            .await;
        assert!(matches!(missing, Err(MatchError::NotFound(_))));
        assert_eq!(m.store.swipe_rows(), 0);
    }

    #[tokio::test]
    async fn status_update_reaches_the_seeker() {
        let m = market();
        m.engine
            .swipe(m.seeker, m.job.id, None, SwipeDirection::Interested)
            .await
            .unwrap();
        let matched = m
            .engine
            .swipe(m.recruiter, m.profile.id, None, SwipeDirection::Interested)
            .await
            .unwrap()
            .summary
            .unwrap();
        let mut seeker_queue = connect(&m.hub, m.seeker.user_id);

        let denied = m
            .engine
            .set_application_status(m.seeker, matched.record.id, ApplicationStatus::Hired)
            .await;
        assert!(matches!(denied, Err(MatchError::Forbidden(_))));

        let updated = m
            .engine
            .set_application_status(m.recruiter, matched.record.id, ApplicationStatus::Interview)
            .await
            .unwrap();
        assert_eq!(updated.record.application_status, ApplicationStatus::Interview);

        let events = event_types(&mut seeker_queue);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["type"], "status_update");
        assert_eq!(events[0]["payload"]["new_status"], "interview");

        let history = m
            .store
            .list_messages(matched.record.id, m.seeker.user_id, 10, 0)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, MessageKind::Status);
        assert_eq!(history[0].sender_id, m.recruiter.user_id);
        assert_eq!(updated.record.job_seeker_unread, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_reciprocal_swipes_match_exactly_once() {
        for _ in 0..25 {
            let m = market();
            let mut recruiter_queue = connect(&m.hub, m.recruiter.user_id);

            let seeker_side = {
                let engine = m.engine.clone();
                let (seeker, job_id) = (m.seeker, m.job.id);
                tokio::spawn(async move {
                    engine.swipe(seeker, job_id, None, SwipeDirection::Interested).await
                })
            };
            let recruiter_side = {
                let engine = m.engine.clone();
                let (recruiter, profile_id) = (m.recruiter, m.profile.id);
                tokio::spawn(async move {
                    engine.swipe(recruiter, profile_id, None, SwipeDirection::Interested).await
                })
            };

            let a = seeker_side.await.unwrap().unwrap();
            let b = recruiter_side.await.unwrap().unwrap();
            assert!(a.is_match || b.is_match);

            assert_eq!(m.store.match_rows(), 1);
            assert_eq!(m.store.user_counters(m.seeker.user_id).total_matches, 1);
            assert_eq!(m.store.user_counters(m.recruiter.user_id).total_matches, 1);
            assert_eq!(m.store.job_match_count(m.job.id), 1);
            assert_eq!(event_types(&mut recruiter_queue).len(), 1);
        }
    }
}
