//! Single-session owner with coalesced refresh.
//!
//! At most one handshake is in flight per manager: the session slot is
//! guarded by an async mutex that stays held for the duration of the
//! handshake, so callers queued behind it observe the session it produced.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::Mutex;

use super::{Session, SessionSource};
use crate::config::ClientConfig;
use crate::errors::MarketDataError;

/// Owns the current [`Session`] for one client instance.
pub struct SessionManager {
    source: Arc<dyn SessionSource>,
    /// Current session, `None` until the first handshake or after a failed refresh.
    slot: Mutex<Option<Arc<Session>>>,
    /// Next generation number to stamp.
    next_generation: AtomicU64,
    /// Number of handshakes performed (successful or not).
    handshakes: AtomicU64,
    ttl: Duration,
    required_cookies: Vec<String>,
}

impl SessionManager {
    /// Create a manager with no session; the first use performs the handshake.
    pub fn new(source: Arc<dyn SessionSource>, config: &ClientConfig) -> Self {
        Self {
            source,
            slot: Mutex::new(None),
            next_generation: AtomicU64::new(1),
            handshakes: AtomicU64::new(0),
            ttl: config.session_ttl(),
            required_cookies: config.required_cookies.clone(),
        }
    }

    /// Return a valid session, performing a handshake if none is held or the
    /// held one is no longer valid.
    pub async fn current(&self) -> Result<Arc<Session>, MarketDataError> {
        let mut slot = self.slot.lock().await;

        if let Some(session) = slot.as_ref() {
            if self.is_valid(session) {
                return Ok(session.clone());
            }
            debug!(
                "Session generation {} is no longer valid, refreshing",
                session.generation()
            );
        }

        self.handshake_into(&mut slot).await
    }

    /// Perform a handshake unconditionally and install the result.
    pub async fn acquire(&self) -> Result<Arc<Session>, MarketDataError> {
        let mut slot = self.slot.lock().await;
        self.handshake_into(&mut slot).await
    }

    /// Replace `old` with a freshly acquired session.
    ///
    /// If `old` has already been superseded by a concurrent refresh, the newer
    /// session is returned without another handshake.
    pub async fn refresh(&self, old: &Session) -> Result<Arc<Session>, MarketDataError> {
        let mut slot = self.slot.lock().await;

        if let Some(session) = slot.as_ref() {
            if session.generation() > old.generation() && self.is_valid(session) {
                debug!(
                    "Session generation {} already replaced by {}, reusing",
                    old.generation(),
                    session.generation()
                );
                return Ok(session.clone());
            }
        }

        info!("Refreshing session generation {}", old.generation());
        self.handshake_into(&mut slot).await
    }

    /// Drop the held session so the next use performs a handshake.
    pub async fn invalidate(&self) {
        let mut slot = self.slot.lock().await;
        *slot = None;
    }

    /// Local validity check; never touches the network.
    ///
    /// A session is valid when it has not expired, holds at least one cookie,
    /// and holds every configured required cookie.
    pub fn is_valid(&self, session: &Session) -> bool {
        !session.is_expired()
            && session.cookie_count() > 0
            && self
                .required_cookies
                .iter()
                .all(|name| session.cookie(name).is_some())
    }

    /// Number of handshakes attempted so far.
    pub fn handshake_count(&self) -> u64 {
        self.handshakes.load(Ordering::SeqCst)
    }

    /// Run the handshake with the slot lock held. The old session is
    /// discarded before the handshake, so a failure leaves the slot empty.
    async fn handshake_into(
        &self,
        slot: &mut Option<Arc<Session>>,
    ) -> Result<Arc<Session>, MarketDataError> {
        *slot = None;
        self.handshakes.fetch_add(1, Ordering::SeqCst);

        let session = match self.source.acquire().await {
            Ok(session) => session,
            Err(e) => {
                warn!("Session handshake failed: {}", e);
                return Err(e);
            }
        };

        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(session.stamp(generation, self.ttl));

        if !self.is_valid(&session) {
            let missing: Vec<&str> = self
                .required_cookies
                .iter()
                .filter(|name| session.cookie(name).is_none())
                .map(String::as_str)
                .collect();
            warn!("Handshake session is missing required cookies {:?}", missing);
            return Err(MarketDataError::UpstreamBlocked {
                status: 200,
                reason: format!("handshake missing required cookies {:?}", missing),
            });
        }

        debug!("Installed session generation {}", generation);
        *slot = Some(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use reqwest::header::HeaderMap;
    use std::sync::atomic::AtomicUsize;

    /// Counts handshakes and hands out sessions with the given cookies.
    struct CountingSource {
        calls: AtomicUsize,
        cookies: Vec<&'static str>,
        delay: Duration,
        fail: bool,
    }

    impl CountingSource {
        fn new(cookies: Vec<&'static str>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                cookies,
                delay: Duration::ZERO,
                fail: false,
            })
        }

        fn slow(delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                cookies: vec!["nsit=abc"],
                delay,
                fail: false,
            })
        }

        fn failing() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                cookies: Vec::new(),
                delay: Duration::ZERO,
                fail: true,
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SessionSource for CountingSource {
        async fn acquire(&self) -> Result<Session, MarketDataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(MarketDataError::Connectivity {
                    message: "connection refused".to_string(),
                });
            }
            Ok(Session::from_set_cookies(
                self.cookies.iter().copied(),
                HeaderMap::new(),
            ))
        }
    }

    fn manager(source: Arc<CountingSource>, config: ClientConfig) -> SessionManager {
        SessionManager::new(source, &config)
    }

    #[tokio::test]
    async fn test_current_acquires_once_and_reuses() {
        let source = CountingSource::new(vec!["nsit=abc"]);
        let manager = manager(source.clone(), ClientConfig::default());

        let first = manager.current().await.unwrap();
        let second = manager.current().await.unwrap();

        assert_eq!(source.calls(), 1);
        assert_eq!(first.generation(), second.generation());
        assert_eq!(manager.handshake_count(), 1);
    }

    #[tokio::test]
    async fn test_refresh_replaces_session() {
        let source = CountingSource::new(vec!["nsit=abc"]);
        let manager = manager(source.clone(), ClientConfig::default());

        let first = manager.current().await.unwrap();
        let refreshed = manager.refresh(&first).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert!(refreshed.generation() > first.generation());

        let current = manager.current().await.unwrap();
        assert_eq!(current.generation(), refreshed.generation());
    }

    #[tokio::test]
    async fn test_refresh_of_superseded_session_is_coalesced() {
        let source = CountingSource::new(vec!["nsit=abc"]);
        let manager = manager(source.clone(), ClientConfig::default());

        let stale = manager.current().await.unwrap();
        let first = manager.refresh(&stale).await.unwrap();
        let second = manager.refresh(&stale).await.unwrap();

        assert_eq!(source.calls(), 2);
        assert_eq!(first.generation(), second.generation());
    }

    #[tokio::test]
    async fn test_concurrent_current_performs_single_handshake() {
        let source = CountingSource::slow(Duration::from_millis(50));
        let manager = Arc::new(manager(source.clone(), ClientConfig::default()));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let manager = manager.clone();
            handles.push(tokio::spawn(async move { manager.current().await }));
        }

        let mut generations = Vec::new();
        for handle in handles {
            generations.push(handle.await.unwrap().unwrap().generation());
        }

        assert_eq!(source.calls(), 1);
        assert!(generations.iter().all(|g| *g == generations[0]));
    }

    #[tokio::test]
    async fn test_concurrent_refresh_of_same_session_is_coalesced() {
        let source = CountingSource::slow(Duration::from_millis(20));
        let manager = Arc::new(manager(source.clone(), ClientConfig::default()));
        let stale = manager.current().await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..5 {
            let manager = manager.clone();
            let stale = stale.clone();
            handles.push(tokio::spawn(async move { manager.refresh(&stale).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_refreshed_before_use() {
        let source = CountingSource::new(vec!["nsit=abc"]);
        let config = ClientConfig {
            session_ttl_seconds: 1,
            ..Default::default()
        };
        let manager = manager(source.clone(), config);

        let first = manager.current().await.unwrap();
        assert!(manager.is_valid(&first));

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(!manager.is_valid(&first));

        let second = manager.current().await.unwrap();
        assert_eq!(source.calls(), 2);
        assert!(second.generation() > first.generation());
    }

    #[tokio::test]
    async fn test_oversized_ttl_is_clamped_not_overflowed() {
        let source = CountingSource::new(vec!["nsit=abc"]);
        let config = ClientConfig {
            session_ttl_seconds: u64::MAX,
            ..Default::default()
        };
        let manager = manager(source.clone(), config);

        let session = manager.current().await.unwrap();

        assert!(manager.is_valid(&session));
        assert_eq!(source.calls(), 1);
    }

    #[tokio::test]
    async fn test_missing_required_cookie_fails_handshake() {
        let source = CountingSource::new(vec!["ak_bmsc=zzz"]);
        let config = ClientConfig {
            required_cookies: vec!["nsit".to_string()],
            ..Default::default()
        };
        let manager = manager(source, config);

        match manager.current().await {
            Err(MarketDataError::UpstreamBlocked { reason, .. }) => {
                assert!(reason.contains("nsit"))
            }
            other => panic!("Expected UpstreamBlocked, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_failed_handshake_leaves_no_session() {
        let source = CountingSource::failing();
        let manager = manager(source.clone(), ClientConfig::default());

        assert!(matches!(
            manager.current().await,
            Err(MarketDataError::Connectivity { .. })
        ));
        assert!(manager.current().await.is_err());
        assert_eq!(source.calls(), 2);
    }

    #[tokio::test]
    async fn test_invalidate_forces_new_handshake() {
        let source = CountingSource::new(vec!["nsit=abc"]);
        let manager = manager(source.clone(), ClientConfig::default());

        manager.current().await.unwrap();
        manager.invalidate().await;
        manager.current().await.unwrap();

        assert_eq!(source.calls(), 2);
    }

    #[test]
    fn test_is_valid_requires_a_cookie() {
        let source = CountingSource::new(Vec::new());
        let manager = manager(source, ClientConfig::default());
        let session = Session::new(Vec::new(), HeaderMap::new()).stamp(1, Duration::from_secs(60));
        assert!(!manager.is_valid(&session));
    }
}
