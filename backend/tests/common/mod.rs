#![allow(dead_code)]

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use swipematch::constants::{USER_ID_HEADER, USER_ROLE_HEADER};
use swipematch::db::MemoryStore;
use swipematch::models::{Identity, JobRef, ProfileRef, Role};
use swipematch::services::SessionConfig;
use swipematch::{AppState, create_router};
use tower::ServiceExt;
use uuid::Uuid;

/// One recruiter with one job, one job seeker with one profile.
pub struct Market {
    pub store: Arc<MemoryStore>,
    pub state: AppState,
    pub router: Router,
    pub seeker: Identity,
    pub recruiter: Identity,
    pub job: JobRef,
    pub profile: ProfileRef,
}

pub fn market() -> Market {
    market_with(SessionConfig::default())
}

pub fn market_with(session: SessionConfig) -> Market {
    let store = Arc::new(MemoryStore::new());
    let seeker = Identity::new(Uuid::new_v4(), Role::JobSeeker);
    let recruiter = Identity::new(Uuid::new_v4(), Role::Recruiter);
    let job = JobRef {
        id: Uuid::new_v4(),
        recruiter_id: recruiter.user_id,
        title: "Senior Rust Engineer".to_string(),
        company_name: "Ferrous Systems".to_string(),
    };
    let profile = ProfileRef {
        id: Uuid::new_v4(),
        user_id: seeker.user_id,
    };
    store.insert_user(seeker.user_id, seeker.role, "Ada");
    store.insert_user(recruiter.user_id, recruiter.role, "Grace");
    store.insert_job(job.clone());
    store.insert_profile(profile.clone());

    let state = AppState::new(store.clone(), session);
    let router = create_router(state.clone(), &[]);

    Market {
        store,
        state,
        router,
        seeker,
        recruiter,
        job,
        profile,
    }
}

pub async fn call(
    router: &Router,
    method: Method,
    uri: &str,
    caller: Option<Identity>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(identity) = caller {
        builder = builder
            .header(USER_ID_HEADER, identity.user_id.to_string())
            .header(USER_ROLE_HEADER, identity.role.as_str());
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    };

    let response = router.clone().oneshot(request).await.expect("response");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), 1024 * 1024)
        .await
        .expect("read body");
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    (status, value)
}
