use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value};

use hostweave_core::token;

/// Recover the guard from a poisoned lock; a panicking request must not take
/// the store down with it.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Authenticated principal. Owned by the authentication collaborator; sessions
/// only hold a weak reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    pub login: String,
}

/// Server-held state for one client, identified by its cookie token.
#[derive(Debug)]
pub struct Session {
    token: String,
    expires_ms: AtomicI64,
    values: Mutex<Map<String, Value>>,
    user: Mutex<Option<Weak<Principal>>>,
}

impl Session {
    fn new(token: String, expires: DateTime<Utc>) -> Self {
        Self {
            token,
            expires_ms: AtomicI64::new(expires.timestamp_millis()),
            values: Mutex::new(Map::new()),
            user: Mutex::new(None),
        }
    }

    /// Throwaway session for static files and error pages. Never stored.
    pub fn anonymous() -> Self {
        Self::new(String::new(), Utc::now())
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn is_anonymous(&self) -> bool {
        self.token.is_empty()
    }

    pub fn expires(&self) -> DateTime<Utc> {
        let ms = self.expires_ms.load(Ordering::Acquire);
        Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
    }

    fn set_expires(&self, at: DateTime<Utc>) {
        self.expires_ms.store(at.timestamp_millis(), Ordering::Release);
    }

    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires() < now
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        lock(&self.values).get(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        lock(&self.values).insert(key.into(), value.into());
    }

    pub fn remove_value(&self, key: &str) -> Option<Value> {
        lock(&self.values).remove(key)
    }

    /// Run `f` with the whole value bag borrowed mutably.
    pub fn with_values<R>(&self, f: impl FnOnce(&mut Map<String, Value>) -> R) -> R {
        f(&mut lock(&self.values))
    }

    /// The logged-in principal, if any and still alive.
    pub fn user(&self) -> Option<Arc<Principal>> {
        lock(&self.user).as_ref().and_then(Weak::upgrade)
    }

    pub fn user_id(&self) -> Option<i64> {
        self.user().map(|u| u.id)
    }

    pub fn set_user(&self, user: Option<&Arc<Principal>>) {
        *lock(&self.user) = user.map(Arc::downgrade);
    }
}

/// Concurrent token -> session registry with sliding TTL.
///
/// One mutex guards every operation, including the token retry loop in
/// [`SessionStore::create`]. The lock is never held across an `.await`.
#[derive(Debug)]
pub struct SessionStore {
    sessions: Mutex<HashMap<String, Arc<Session>>>,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl)
                .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100)),
        }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// `now + ttl`, saturating at the latest representable instant.
    fn expiry_from(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_add_signed(self.ttl)
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    pub fn create(&self) -> Arc<Session> {
        self.create_at(Utc::now())
    }

    /// Generate a non-colliding token and insert, under one lock acquisition.
    pub fn create_at(&self, now: DateTime<Utc>) -> Arc<Session> {
        let mut map = lock(&self.sessions);
        let token = loop {
            let candidate = token::generate();
            if !map.contains_key(&candidate) {
                break candidate;
            }
        };
        let session = Arc::new(Session::new(token.clone(), self.expiry_from(now)));
        map.insert(token, Arc::clone(&session));
        session
    }

    pub fn get(&self, token: &str) -> Option<Arc<Session>> {
        self.get_at(token, Utc::now())
    }

    /// Lookup only. An entry the sweeper has not reached yet reads as absent
    /// once expired, but is left for the sweeper to delete.
    pub fn get_at(&self, token: &str, now: DateTime<Utc>) -> Option<Arc<Session>> {
        lock(&self.sessions)
            .get(token)
            .filter(|s| !s.is_expired_at(now))
            .cloned()
    }

    pub fn refresh(&self, token: &str) -> Option<DateTime<Utc>> {
        self.refresh_at(token, Utc::now())
    }

    /// Slide the expiry to `now + ttl`. Returns the new expiry if present.
    pub fn refresh_at(&self, token: &str, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let map = lock(&self.sessions);
        let session = map.get(token)?;
        let expires = self.expiry_from(now);
        session.set_expires(expires);
        Some(expires)
    }

    /// Lookup and refresh in one critical section; used by the dispatcher.
    pub fn touch_at(&self, token: &str, now: DateTime<Utc>) -> Option<Arc<Session>> {
        let map = lock(&self.sessions);
        let session = map.get(token).filter(|s| !s.is_expired_at(now))?;
        session.set_expires(self.expiry_from(now));
        Some(Arc::clone(session))
    }

    pub fn remove(&self, token: &str) -> Option<Arc<Session>> {
        lock(&self.sessions).remove(token)
    }

    /// Live sessions the given user is logged into.
    pub fn sessions_for_user(&self, user_id: i64) -> Vec<Arc<Session>> {
        lock(&self.sessions)
            .values()
            .filter(|s| s.user_id() == Some(user_id))
            .cloned()
            .collect()
    }

    /// Log a user out everywhere: clear the user on each of their sessions,
    /// then drop those sessions. Returns how many were removed.
    pub fn remove_all_for_user(&self, user_id: i64) -> usize {
        let mut map = lock(&self.sessions);
        let tokens: Vec<String> = map
            .iter()
            .filter(|(_, s)| s.user_id() == Some(user_id))
            .map(|(t, _)| t.clone())
            .collect();
        for t in &tokens {
            if let Some(s) = map.remove(t) {
                s.set_user(None);
            }
        }
        tokens.len()
    }

    pub fn len(&self) -> usize {
        lock(&self.sessions).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// One sweep cycle: snapshot expired candidates, then delete each only if
    /// it is still expired when re-checked under the delete's lock.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        self.expired_candidates(now)
            .iter()
            .filter(|t| self.evict_if_expired(t, now))
            .count()
    }

    pub(crate) fn expired_candidates(&self, now: DateTime<Utc>) -> Vec<String> {
        lock(&self.sessions)
            .iter()
            .filter(|(_, s)| s.is_expired_at(now))
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub(crate) fn evict_if_expired(&self, token: &str, now: DateTime<Utc>) -> bool {
        let mut map = lock(&self.sessions);
        match map.get(token) {
            Some(s) if s.is_expired_at(now) => {
                map.remove(token);
                true
            }
            _ => false,
        }
    }
}
