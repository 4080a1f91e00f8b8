//! Durable session storage and derived user claims.

use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, instrument, warn};

use crate::Result;
use crate::error::SessionError;
use crate::storage::{ACCESS_TOKEN_KEY, KeyValueStore, REFRESH_TOKEN_KEY};
use crate::token::{self, AccessToken, Claims, RefreshToken};

/// A token pair returned by a successful login or refresh.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionData {
    /// The access token, now also persisted.
    pub access_token: AccessToken,
    /// The refresh token, now also persisted.
    pub refresh_token: RefreshToken,
    /// Seconds until the access token expires, as reported by the server.
    pub access_token_expiration: Option<u64>,
    /// Seconds until the refresh token expires, as reported by the server.
    pub refresh_token_expiration: Option<u64>,
}

/// The current session: a token pair in durable storage plus the claims
/// decoded from its access token.
///
/// # Claims cache
///
/// [`current_user`](Self::current_user) decodes the stored access token at
/// most once and keeps the result in memory. The cache is dropped by exactly
/// these events:
///
/// - logout ([`clear_session`](Self::clear_session))
/// - explicit refresh ([`invalidate`](Self::invalidate), and every successful
///   [`save_session`](Self::save_session), which stores a new token)
///
/// Claims that change on the server are therefore not visible until one of
/// these happens or the process restarts.
///
/// A decode that overlaps one of these events is returned to its caller but
/// not cached.
#[derive(Debug)]
pub struct SessionStore {
    storage: Arc<dyn KeyValueStore>,
    cache: RwLock<ClaimsCache>,
}

/// Cached claims plus the number of invalidations seen so far.
#[derive(Debug, Default)]
struct ClaimsCache {
    generation: u64,
    claims: Option<Claims>,
}

impl SessionStore {
    /// Create a session store over `storage`.
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        Self {
            storage,
            cache: RwLock::new(ClaimsCache::default()),
        }
    }

    /// True iff an access token is stored. The token is not validated.
    pub fn has_session(&self) -> bool {
        self.read_key(ACCESS_TOKEN_KEY).is_some()
    }

    /// The stored access token, if any.
    pub fn access_token(&self) -> Option<AccessToken> {
        self.read_key(ACCESS_TOKEN_KEY).map(AccessToken::new)
    }

    /// The stored refresh token, if any.
    pub fn refresh_token(&self) -> Option<RefreshToken> {
        self.read_key(REFRESH_TOKEN_KEY).map(RefreshToken::new)
    }

    /// Claims of the current user, decoded from the stored access token.
    ///
    /// Returns `None` if no token is stored, if the stored token is not
    /// three-part, or if its payload does not decode. The last two cases are
    /// logged.
    pub fn current_user(&self) -> Option<Claims> {
        let generation = {
            let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(claims) = cache.claims.as_ref() {
                return Some(claims.clone());
            }
            cache.generation
        };

        let Some(token) = self.read_key(ACCESS_TOKEN_KEY) else {
            debug!("No auth token found");
            return None;
        };

        if !token::is_valid_token(&token) {
            warn!("Invalid access token in storage");
            return None;
        }

        let claims = match token::decode_claims(&token) {
            Ok(claims) => claims,
            Err(e) => {
                warn!(error = %e, "Stored access token has undecodable claims");
                return None;
            }
        };

        debug!(sub = ?claims.subject(), role = ?claims.role_str(), "Decoded current user");
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        if cache.generation == generation {
            cache.claims = Some(claims.clone());
        } else {
            debug!("Session changed while decoding, not caching");
        }
        Some(claims)
    }

    /// Persist a new token pair.
    ///
    /// Both tokens must be three-part. If either is not, nothing is written
    /// and the previous session stays as it was.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::InvalidSessionData`] for malformed tokens, or a
    /// storage error if the write fails.
    #[instrument(skip_all)]
    pub fn save_session(&self, access_token: &str, refresh_token: &str) -> Result<()> {
        if !token::is_valid_token(access_token) || !token::is_valid_token(refresh_token) {
            warn!("Refusing to store malformed tokens");
            return Err(SessionError::InvalidSessionData.into());
        }

        self.storage.set_many(&[
            (ACCESS_TOKEN_KEY, access_token),
            (REFRESH_TOKEN_KEY, refresh_token),
        ])?;
        self.invalidate();

        debug!("Session saved");
        Ok(())
    }

    /// Remove both stored tokens and drop the claims cache.
    ///
    /// Never fails; a storage error is logged. Calling it again is a no-op.
    #[instrument(skip_all)]
    pub fn clear_session(&self) {
        if let Err(e) = self.storage.remove_many(&[ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY]) {
            warn!(error = %e, "Failed to remove stored tokens");
        }
        self.invalidate();
        debug!("Session cleared");
    }

    /// Drop the cached claims so the next [`current_user`](Self::current_user)
    /// re-decodes the stored token.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        cache.generation = cache.generation.wrapping_add(1);
        cache.claims = None;
    }

    fn read_key(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value,
            Err(e) => {
                warn!(key, error = %e, "Failed to read from storage");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::storage::MemoryStore;
    use crate::token::encode_unsigned;
    use std::sync::Barrier;
    use std::sync::atomic::{AtomicBool, Ordering};

    fn store() -> (Arc<MemoryStore>, SessionStore) {
        let storage = Arc::new(MemoryStore::new());
        let session = SessionStore::new(storage.clone());
        (storage, session)
    }

    fn token_for(sub: &str, role: &str) -> String {
        encode_unsigned(&Claims::new().with("sub", sub).with("role", role))
    }

    #[test]
    fn empty_store_has_no_session() {
        let (_, session) = store();
        assert!(!session.has_session());
        assert!(session.current_user().is_none());
        assert!(session.access_token().is_none());
    }

    #[test]
    fn current_user_decodes_admin_claims() {
        let (storage, session) = store();
        // "a.<payload>.c" with payload {"sub":"u1","role":"admin"}
        let payload = token_for("u1", "admin").split('.').nth(1).unwrap().to_string();
        storage
            .set(ACCESS_TOKEN_KEY, &format!("a.{}.c", payload))
            .unwrap();

        let user = session.current_user().unwrap();
        assert_eq!(user.subject(), Some("u1"));
        assert_eq!(user.role_str(), Some("admin"));
        assert!(user.is_admin());
    }

    #[test]
    fn has_session_does_not_validate() {
        let (storage, session) = store();
        storage.set(ACCESS_TOKEN_KEY, "garbage").unwrap();
        assert!(session.has_session());
        assert!(session.current_user().is_none());
    }

    #[test]
    fn undecodable_payload_yields_no_user() {
        let (storage, session) = store();
        storage.set(ACCESS_TOKEN_KEY, "a.%%%.c").unwrap();
        assert!(session.current_user().is_none());
    }

    #[test]
    fn claims_are_cached_until_invalidated() {
        let (storage, session) = store();
        storage
            .set(ACCESS_TOKEN_KEY, &token_for("u1", "user"))
            .unwrap();
        assert_eq!(session.current_user().unwrap().subject(), Some("u1"));

        // Out-of-band change is not seen while cached.
        storage
            .set(ACCESS_TOKEN_KEY, &token_for("u2", "user"))
            .unwrap();
        assert_eq!(session.current_user().unwrap().subject(), Some("u1"));

        session.invalidate();
        assert_eq!(session.current_user().unwrap().subject(), Some("u2"));
    }

    #[test]
    fn save_session_persists_both_keys() {
        let (storage, session) = store();
        let access = token_for("u1", "anonymous");
        let refresh = encode_unsigned(&Claims::new().with("kind", "refresh"));

        session.save_session(&access, &refresh).unwrap();

        assert_eq!(storage.get(ACCESS_TOKEN_KEY).unwrap(), Some(access));
        assert_eq!(storage.get(REFRESH_TOKEN_KEY).unwrap(), Some(refresh));
        assert_eq!(session.current_user().unwrap().subject(), Some("u1"));
    }

    #[test]
    fn save_session_replaces_cached_user() {
        let (_, session) = store();
        session
            .save_session(&token_for("u1", "user"), "r.r.r")
            .unwrap();
        assert_eq!(session.current_user().unwrap().subject(), Some("u1"));

        session
            .save_session(&token_for("u2", "admin"), "r.r.r")
            .unwrap();
        assert_eq!(session.current_user().unwrap().subject(), Some("u2"));
    }

    #[test]
    fn save_session_is_all_or_nothing() {
        let (storage, session) = store();
        session.save_session("old.access.token", "old.refresh.token").unwrap();

        for (access, refresh) in [
            ("new.access.token", "not-a-token"),
            ("not-a-token", "new.refresh.token"),
        ] {
            let err = session.save_session(access, refresh).unwrap_err();
            assert!(matches!(
                err,
                Error::Session(SessionError::InvalidSessionData)
            ));
            assert_eq!(
                storage.get(ACCESS_TOKEN_KEY).unwrap().as_deref(),
                Some("old.access.token")
            );
            assert_eq!(
                storage.get(REFRESH_TOKEN_KEY).unwrap().as_deref(),
                Some("old.refresh.token")
            );
        }
    }

    #[test]
    fn failed_save_on_empty_store_writes_nothing() {
        let (storage, session) = store();
        assert!(session.save_session("a.b.c", "").is_err());
        assert!(storage.is_empty());
    }

    #[test]
    fn access_and_refresh_keys_are_distinct() {
        let (_, session) = store();
        session.save_session("a.a.a", "r.r.r").unwrap();
        assert_eq!(session.access_token().unwrap().as_str(), "a.a.a");
        assert_eq!(session.refresh_token().unwrap().as_str(), "r.r.r");
    }

    #[test]
    fn clear_session_is_idempotent() {
        let (storage, session) = store();
        storage.set("lang", "en").unwrap();
        session
            .save_session(&token_for("u1", "user"), "r.r.r")
            .unwrap();
        assert!(session.current_user().is_some());

        session.clear_session();
        let once = (
            session.has_session(),
            session.current_user(),
            session.refresh_token(),
            storage.len(),
        );

        session.clear_session();
        let twice = (
            session.has_session(),
            session.current_user(),
            session.refresh_token(),
            storage.len(),
        );

        assert_eq!(once, twice);
        assert_eq!(once, (false, None, None, 1));
    }

    /// Holds the first access-token read until the test releases it.
    #[derive(Debug)]
    struct PausingStore {
        inner: MemoryStore,
        paused: AtomicBool,
        read_done: Barrier,
        resume: Barrier,
    }

    impl PausingStore {
        fn new() -> Self {
            Self {
                inner: MemoryStore::new(),
                paused: AtomicBool::new(false),
                read_done: Barrier::new(2),
                resume: Barrier::new(2),
            }
        }
    }

    impl KeyValueStore for PausingStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            let value = self.inner.get(key)?;
            if key == ACCESS_TOKEN_KEY && !self.paused.swap(true, Ordering::SeqCst) {
                self.read_done.wait();
                self.resume.wait();
            }
            Ok(value)
        }

        fn set_many(&self, entries: &[(&str, &str)]) -> Result<()> {
            self.inner.set_many(entries)
        }

        fn remove_many(&self, keys: &[&str]) -> Result<()> {
            self.inner.remove_many(keys)
        }
    }

    #[test]
    fn decode_overlapping_a_save_is_not_cached() {
        let storage = Arc::new(PausingStore::new());
        let first = token_for("u1", "user");
        storage
            .inner
            .set_many(&[(ACCESS_TOKEN_KEY, first.as_str()), (REFRESH_TOKEN_KEY, "r.r.r")])
            .unwrap();
        let session = SessionStore::new(storage.clone());

        std::thread::scope(|s| {
            let reader = s.spawn(|| session.current_user());

            // The reader holds the old token; replace the session under it.
            storage.read_done.wait();
            session
                .save_session(&token_for("u2", "user"), "r.r.r")
                .unwrap();
            storage.resume.wait();

            let seen = reader.join().unwrap().unwrap();
            assert_eq!(seen.subject(), Some("u1"));
        });

        assert_eq!(session.current_user().unwrap().subject(), Some("u2"));
    }
}
