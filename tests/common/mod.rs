//! Shared fixtures for the integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use chrono::{DateTime, Duration, TimeZone, Utc};
use http_body_util::BodyExt;
use loyalty_points_engine::api::{self, AppState, ACTOR_ID_HEADER, ACTOR_ROLE_HEADER};
use loyalty_points_engine::core::{
    EngineConfig, InMemoryLedgerStore, LedgerStore, LoyaltyEngine, RetryPolicy, Versioned,
};
use loyalty_points_engine::types::{Member, StoreError, Transaction};
use serde_json::Value;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap()
}

/// Pending transaction `transactions/{doc_id}` with transaction id `TX-{doc_id}`
pub fn pending_tx(doc_id: &str, member_id: &str, points: i64, minutes_after_base: i64) -> Transaction {
    let mut tx = Transaction::pending(
        doc_id,
        format!("transactions/{}", doc_id),
        format!("TX-{}", doc_id),
        member_id,
        points,
        base_time() + Duration::minutes(minutes_after_base),
    );
    tx.store_location = "Downtown".to_string();
    tx.amount = points * 100;
    tx
}

pub fn doc_path(doc_id: &str) -> String {
    format!("transactions/{}", doc_id)
}

/// Engine config with no backoff sleeps and a generous retry budget
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        retry: RetryPolicy::new(64, std::time::Duration::ZERO, std::time::Duration::ZERO),
        ..EngineConfig::default()
    }
}

pub fn engine_over(store: Arc<dyn LedgerStore>) -> LoyaltyEngine {
    LoyaltyEngine::new(store, fast_config())
}

pub fn test_app(store: Arc<dyn LedgerStore>) -> Router {
    api::router(AppState::new(
        engine_over(store),
        vec!["admin".to_string(), "staff".to_string()],
    ))
}

/// Build a request; `actor` is `(id, role)`
pub fn request(method: Method, uri: &str, body: Option<Value>, actor: Option<(&str, &str)>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some((id, role)) = actor {
        builder = builder.header(ACTOR_ID_HEADER, id).header(ACTOR_ROLE_HEADER, role);
    }
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub const STAFF: Option<(&str, &str)> = Some(("staff-1", "staff"));

/// Send one request and decode the JSON response body
pub async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

/// Wraps an in-memory store, injecting failures into member writes
///
/// - members in `failing_members` get `Unavailable` on every `put_member`
/// - `conflicts` forces that many `Conflict` results on `put_member` before
///   writes go through
#[derive(Debug)]
pub struct FaultyStore {
    pub inner: Arc<InMemoryLedgerStore>,
    failing_members: Mutex<HashSet<String>>,
    conflicts: AtomicU32,
    member_writes: AtomicU32,
}

impl FaultyStore {
    pub fn new(inner: Arc<InMemoryLedgerStore>) -> Self {
        Self {
            inner,
            failing_members: Mutex::new(HashSet::new()),
            conflicts: AtomicU32::new(0),
            member_writes: AtomicU32::new(0),
        }
    }

    pub fn seeded(members: Vec<Member>, transactions: Vec<Transaction>) -> Self {
        Self::new(Arc::new(InMemoryLedgerStore::seeded(members, transactions)))
    }

    pub fn fail_member_writes(&self, member_id: &str) {
        self.failing_members.lock().unwrap().insert(member_id.to_string());
    }

    pub fn heal(&self) {
        self.failing_members.lock().unwrap().clear();
    }

    pub fn inject_conflicts(&self, count: u32) {
        self.conflicts.store(count, Ordering::SeqCst);
    }

    /// Member writes attempted, including injected failures
    pub fn member_writes(&self) -> u32 {
        self.member_writes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LedgerStore for FaultyStore {
    async fn get_member(&self, member_id: &str) -> Result<Option<Versioned<Member>>, StoreError> {
        self.inner.get_member(member_id).await
    }

    async fn put_member(&self, member: Member, expected_version: Option<u64>) -> Result<u64, StoreError> {
        self.member_writes.fetch_add(1, Ordering::SeqCst);
        let failing = self.failing_members.lock().unwrap().contains(&member.id);
        if failing {
            return Err(StoreError::unavailable(format!("injected failure for {}", member.id)));
        }
        let injected = self
            .conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(StoreError::conflict(&member.id));
        }
        self.inner.put_member(member, expected_version).await
    }

    async fn get_transaction(&self, doc_path: &str) -> Result<Option<Versioned<Transaction>>, StoreError> {
        self.inner.get_transaction(doc_path).await
    }

    async fn put_transaction(
        &self,
        transaction: Transaction,
        expected_version: Option<u64>,
    ) -> Result<u64, StoreError> {
        self.inner.put_transaction(transaction, expected_version).await
    }

    async fn scan_transactions(&self, cap: usize) -> Result<Vec<Transaction>, StoreError> {
        self.inner.scan_transactions(cap).await
    }
}
