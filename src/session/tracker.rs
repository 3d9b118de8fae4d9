//! Session Tracker
//! Mission: Keep client-local session state honest: refresh on activity,
//! force logout after inactivity, fail closed on missing bookkeeping.
//!
//! The transitions are pure functions over [`SessionState`]; [`SessionTracker`]
//! is the adapter that reads and writes storage, fires the notice and redirect,
//! and runs the once-a-minute check on a tokio interval.

use crate::auth::models::Role;
use crate::session::{
    browser::{Destination, Navigator, Notifier},
    clock::Clock,
    storage::{keys, SessionStorage},
};
use std::sync::Arc;
use std::time::Duration;
use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, info, trace};

pub const SESSION_EXPIRED_NOTICE: &str = "Session expired due to inactivity. Please log in again.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionConfig {
    /// Longest allowed gap since the last interaction
    pub inactivity_limit: Duration,
    /// Period of the expiry check
    pub check_interval: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            inactivity_limit: Duration::from_secs(5 * 60),
            check_interval: Duration::from_secs(60),
        }
    }
}

/// Interactions that count as activity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InteractionEvent {
    PointerMove,
    KeyDown,
    Click,
    TouchStart,
}

impl InteractionEvent {
    pub const ALL: [InteractionEvent; 4] = [
        InteractionEvent::PointerMove,
        InteractionEvent::KeyDown,
        InteractionEvent::Click,
        InteractionEvent::TouchStart,
    ];

    pub fn dom_name(&self) -> &'static str {
        match self {
            InteractionEvent::PointerMove => "mousemove",
            InteractionEvent::KeyDown => "keydown",
            InteractionEvent::Click => "click",
            InteractionEvent::TouchStart => "touchstart",
        }
    }

    pub fn from_dom_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|e| e.dom_name() == name)
    }
}

/// Snapshot of the session keys in storage
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub token: Option<String>,
    pub role: Option<String>,
    pub username: Option<String>,
    /// Epoch milliseconds
    pub last_activity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Anonymous,
    Active,
    Expired,
}

/// Why a session with a token counts as stale
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaleReason {
    /// Token present but no (parseable) activity timestamp
    NoActivityRecorded,
    Idle { idle_ms: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InactivityCheck {
    /// Nothing to expire
    NoSession,
    Active,
    Stale(StaleReason),
}

impl SessionState {
    /// State right after a successful login
    pub fn logged_in(token: &str, role: Option<Role>, username: Option<&str>, now_ms: i64) -> Self {
        Self {
            token: Some(token.to_string()),
            role: role.map(|r| r.as_str().to_string()),
            username: username.map(str::to_string),
            last_activity: Some(now_ms),
        }
    }

    pub fn load(storage: &dyn SessionStorage) -> Self {
        Self {
            token: storage.get(keys::TOKEN).filter(|t| !t.is_empty()),
            role: storage.get(keys::ROLE),
            username: storage.get(keys::USERNAME),
            // Unparseable timestamps read as missing
            last_activity: storage
                .get(keys::LAST_ACTIVITY)
                .and_then(|v| v.trim().parse::<i64>().ok()),
        }
    }

    /// Write the fields that differ from `previous`.
    ///
    /// `token` is the commit point: it is written after the other keys when
    /// a session starts and removed before them when it ends, so another tab
    /// never sees a token without its `lastActivity`.
    pub fn store_changes(&self, previous: &SessionState, storage: &dyn SessionStorage) {
        let last_activity = self.last_activity.map(|ms| ms.to_string());
        let previous_activity = previous.last_activity.map(|ms| ms.to_string());

        let token = (keys::TOKEN, &self.token, &previous.token);
        let details = [
            (keys::ROLE, &self.role, &previous.role),
            (keys::USERNAME, &self.username, &previous.username),
            (keys::LAST_ACTIVITY, &last_activity, &previous_activity),
        ];

        let ordered: Vec<_> = if self.has_token() {
            details.into_iter().chain([token]).collect()
        } else {
            [token].into_iter().chain(details).collect()
        };

        for (key, new, old) in ordered {
            match new {
                Some(value) if new != old => storage.set(key, value),
                Some(_) => {}
                // Removing also drops values that did not parse on load
                None => storage.remove(key),
            }
        }
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// Stale reason if a token is present and activity is missing or too old
    pub fn staleness(&self, now_ms: i64, limit: Duration) -> Option<StaleReason> {
        if !self.has_token() {
            return None;
        }
        match self.last_activity {
            None => Some(StaleReason::NoActivityRecorded),
            Some(last) => {
                let idle_ms = now_ms.saturating_sub(last);
                (idle_ms > limit.as_millis() as i64).then_some(StaleReason::Idle { idle_ms })
            }
        }
    }

    pub fn phase(&self, now_ms: i64, limit: Duration) -> SessionPhase {
        if !self.has_token() {
            SessionPhase::Anonymous
        } else if self.staleness(now_ms, limit).is_some() {
            SessionPhase::Expired
        } else {
            SessionPhase::Active
        }
    }

    /// Header value for protected API calls
    pub fn authorization_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }
}

/// Activity refresh: only a live session gets its timestamp bumped
pub fn refresh_activity(state: &SessionState, now_ms: i64) -> SessionState {
    if !state.has_token() {
        return state.clone();
    }
    SessionState {
        last_activity: Some(now_ms),
        ..state.clone()
    }
}

/// Periodic check: a stale session is replaced by the empty state
pub fn check_inactivity(
    state: &SessionState,
    now_ms: i64,
    limit: Duration,
) -> (SessionState, InactivityCheck) {
    if !state.has_token() {
        return (state.clone(), InactivityCheck::NoSession);
    }
    match state.staleness(now_ms, limit) {
        Some(reason) => (SessionState::default(), InactivityCheck::Stale(reason)),
        None => (state.clone(), InactivityCheck::Active),
    }
}

/// Everything a tab's session code talks to
#[derive(Clone)]
pub struct SessionContext {
    pub storage: Arc<dyn SessionStorage>,
    pub clock: Arc<dyn Clock>,
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub config: SessionConfig,
}

pub struct SessionTracker {
    ctx: SessionContext,
}

impl SessionTracker {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> SessionState {
        SessionState::load(self.ctx.storage.as_ref())
    }

    pub fn phase(&self) -> SessionPhase {
        self.state()
            .phase(self.ctx.clock.now_ms(), self.ctx.config.inactivity_limit)
    }

    /// Anonymous -> Active after a successful login
    pub fn begin(&self, token: &str, role: Option<Role>, username: Option<&str>) {
        let previous = self.state();
        let next = SessionState::logged_in(token, role, username, self.ctx.clock.now_ms());
        next.store_changes(&previous, self.ctx.storage.as_ref());

        info!(
            role = role.map(|r| r.as_str()).unwrap_or("unknown"),
            "Session started"
        );
    }

    /// Refresh `lastActivity` if a token is present; returns whether it did
    pub fn record_interaction(&self, event: InteractionEvent) -> bool {
        let previous = self.state();
        if !previous.has_token() {
            return false;
        }

        let next = refresh_activity(&previous, self.ctx.clock.now_ms());
        next.store_changes(&previous, self.ctx.storage.as_ref());
        trace!(event = event.dom_name(), "Activity recorded");
        true
    }

    /// Run one inactivity check; a stale session is replaced by the checked
    /// state, then the user is told and sent to login
    pub fn check(&self) -> InactivityCheck {
        let previous = self.state();
        let (next, outcome) = check_inactivity(
            &previous,
            self.ctx.clock.now_ms(),
            self.ctx.config.inactivity_limit,
        );

        if let InactivityCheck::Stale(reason) = outcome {
            info!(?reason, "Session stale, forcing logout");
            next.store_changes(&previous, self.ctx.storage.as_ref());
            self.ctx.notifier.notify(SESSION_EXPIRED_NOTICE);
            self.ctx.navigator.navigate(Destination::Login);
        }

        outcome
    }

    /// Explicit logout: the token goes, display keys are the UI's business
    pub fn logout(&self) {
        self.ctx.storage.remove(keys::TOKEN);
        info!("Logged out");
    }

    pub fn authorization_header(&self) -> Option<String> {
        self.state().authorization_header()
    }

    /// Run [`check`](Self::check) every `check_interval`, first one period
    /// after spawning
    pub fn spawn_inactivity_checks(self: &Arc<Self>) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            let period = tracker.ctx.config.check_interval;
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                tracker.check();
            }
        })
    }

    /// Feed interaction events from an event source into the refresh handler
    pub fn spawn_interaction_listener(
        self: &Arc<Self>,
        mut events: mpsc::UnboundedReceiver<InteractionEvent>,
    ) -> JoinHandle<()> {
        let tracker = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                tracker.record_interaction(event);
            }
            debug!("Interaction source closed");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{
        browser::RecordingBrowser,
        clock::ManualClock,
        storage::{MemoryStorage, SharedStorage},
    };
    use parking_lot::Mutex;

    /// Storage that logs each mutation in order
    #[derive(Default)]
    struct RecordingStorage {
        inner: MemoryStorage,
        log: Mutex<Vec<String>>,
    }

    impl RecordingStorage {
        fn writes(&self) -> Vec<String> {
            self.log.lock().clone()
        }
    }

    impl SessionStorage for RecordingStorage {
        fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key)
        }

        fn set(&self, key: &str, value: &str) {
            self.log.lock().push(format!("set {}", key));
            self.inner.set(key, value);
        }

        fn remove(&self, key: &str) {
            self.log.lock().push(format!("remove {}", key));
            self.inner.remove(key);
        }

        fn clear(&self) {
            self.log.lock().push("clear".to_string());
            self.inner.clear();
        }
    }

    const T0: i64 = 1_700_000_000_000;
    const MINUTE_MS: i64 = 60_000;

    struct Harness {
        storage: Arc<MemoryStorage>,
        clock: Arc<ManualClock>,
        browser: Arc<RecordingBrowser>,
        tracker: Arc<SessionTracker>,
    }

    fn harness() -> Harness {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(T0));
        let browser = Arc::new(RecordingBrowser::new());
        let tracker = Arc::new(SessionTracker::new(SessionContext {
            storage: storage.clone(),
            clock: clock.clone(),
            navigator: browser.clone(),
            notifier: browser.clone(),
            config: SessionConfig::default(),
        }));
        Harness {
            storage,
            clock,
            browser,
            tracker,
        }
    }

    fn active(last_activity: Option<i64>) -> SessionState {
        SessionState {
            token: Some("abc".to_string()),
            role: Some("user".to_string()),
            username: Some("ada".to_string()),
            last_activity,
        }
    }

    #[test]
    fn test_refresh_requires_token() {
        let anonymous = SessionState::default();
        assert_eq!(refresh_activity(&anonymous, T0).last_activity, None);

        let refreshed = refresh_activity(&active(Some(T0)), T0 + 5_000);
        assert_eq!(refreshed.last_activity, Some(T0 + 5_000));
        assert_eq!(refreshed.token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_six_idle_minutes_expire_a_five_minute_session() {
        let limit = Duration::from_secs(5 * 60);
        let (next, outcome) = check_inactivity(&active(Some(T0 - 6 * MINUTE_MS)), T0, limit);

        assert_eq!(
            outcome,
            InactivityCheck::Stale(StaleReason::Idle {
                idle_ms: 6 * MINUTE_MS
            })
        );
        assert_eq!(next, SessionState::default());
    }

    #[test]
    fn test_exactly_at_limit_is_still_active() {
        let limit = Duration::from_secs(5 * 60);
        let state = active(Some(T0 - 5 * MINUTE_MS));
        let (next, outcome) = check_inactivity(&state, T0, limit);

        assert_eq!(outcome, InactivityCheck::Active);
        assert_eq!(next, state);
    }

    #[test]
    fn test_token_without_activity_fails_closed() {
        let limit = Duration::from_secs(5 * 60);
        let (_, outcome) = check_inactivity(&active(None), T0, limit);
        assert_eq!(outcome, InactivityCheck::Stale(StaleReason::NoActivityRecorded));
        assert_eq!(active(None).phase(T0, limit), SessionPhase::Expired);
    }

    #[test]
    fn test_no_token_is_a_no_op() {
        let limit = Duration::from_secs(5 * 60);
        let (next, outcome) = check_inactivity(&SessionState::default(), T0, limit);
        assert_eq!(outcome, InactivityCheck::NoSession);
        assert_eq!(next, SessionState::default());
    }

    #[test]
    fn test_garbled_timestamp_reads_as_missing() {
        let storage = MemoryStorage::new();
        storage.set(keys::TOKEN, "abc");
        storage.set(keys::LAST_ACTIVITY, "yesterday");

        let state = SessionState::load(&storage);
        assert_eq!(state.last_activity, None);
        assert_eq!(
            state.staleness(T0, Duration::from_secs(300)),
            Some(StaleReason::NoActivityRecorded)
        );
    }

    #[test]
    fn test_extreme_timestamp_fails_closed() {
        let storage = MemoryStorage::new();
        storage.set(keys::TOKEN, "abc");
        storage.set(keys::LAST_ACTIVITY, &i64::MIN.to_string());

        let state = SessionState::load(&storage);
        let limit = Duration::from_secs(300);
        assert_eq!(
            state.staleness(T0, limit),
            Some(StaleReason::Idle { idle_ms: i64::MAX })
        );
        assert!(matches!(
            check_inactivity(&state, T0, limit).1,
            InactivityCheck::Stale(_)
        ));
    }

    #[test]
    fn test_token_is_written_last_and_removed_first() {
        let storage = RecordingStorage::default();
        let previous = SessionState::default();
        let next = SessionState::logged_in("abc", Some(Role::Vendor), Some("Shop"), T0);

        next.store_changes(&previous, &storage);
        assert_eq!(storage.writes().last().map(String::as_str), Some("set token"));

        storage.log.lock().clear();
        SessionState::default().store_changes(&next, &storage);
        assert_eq!(
            storage.writes().first().map(String::as_str),
            Some("remove token")
        );
        for key in keys::ALL {
            assert_eq!(storage.get(key), None);
        }
    }

    #[test]
    fn test_other_tab_never_sees_token_without_activity() {
        let shared = SharedStorage::new();
        let a = shared.open_tab();
        let b = shared.open_tab();
        let mut b_events = b.subscribe();

        SessionState::logged_in("abc", Some(Role::User), None, T0)
            .store_changes(&SessionState::default(), &a);

        // Rebuild b's view one write at a time and render after each
        let replica = MemoryStorage::new();
        let mut applied = 0;
        while let Some(event) = b_events.try_recv() {
            applied += 1;
            if let Some(key) = event.key.as_deref() {
                match event.new_value.as_deref() {
                    Some(value) => replica.set(key, value),
                    None => replica.remove(key),
                }
            }
            let view = SessionState::load(&replica);
            assert_ne!(
                view.phase(T0, Duration::from_secs(300)),
                SessionPhase::Expired,
                "expired view after write {}",
                applied
            );
        }
        assert_eq!(applied, 3);
        assert_eq!(SessionState::load(&b).token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_stale_check_drops_garbled_timestamp() {
        let h = harness();
        h.storage.set(keys::TOKEN, "abc");
        h.storage.set(keys::ROLE, "user");
        h.storage.set(keys::LAST_ACTIVITY, "yesterday");

        assert_eq!(
            h.tracker.check(),
            InactivityCheck::Stale(StaleReason::NoActivityRecorded)
        );
        for key in keys::ALL {
            assert_eq!(h.storage.get(key), None, "{} not cleared", key);
        }
        assert_eq!(h.browser.notices(), vec![SESSION_EXPIRED_NOTICE.to_string()]);
    }

    #[test]
    fn test_interaction_event_names() {
        for event in InteractionEvent::ALL {
            assert_eq!(InteractionEvent::from_dom_name(event.dom_name()), Some(event));
        }
        assert_eq!(InteractionEvent::from_dom_name("scroll"), None);
    }

    #[test]
    fn test_begin_stores_session() {
        let h = harness();
        h.tracker.begin("abc", Some(Role::Vendor), Some("Shop"));

        assert_eq!(h.storage.get(keys::TOKEN).as_deref(), Some("abc"));
        assert_eq!(h.storage.get(keys::ROLE).as_deref(), Some("vendor"));
        assert_eq!(h.storage.get(keys::USERNAME).as_deref(), Some("Shop"));
        assert_eq!(
            h.storage.get(keys::LAST_ACTIVITY),
            Some(T0.to_string())
        );
        assert_eq!(h.tracker.phase(), SessionPhase::Active);
        assert_eq!(
            h.tracker.authorization_header().as_deref(),
            Some("Bearer abc")
        );
    }

    #[test]
    fn test_interaction_updates_timestamp_only_with_token() {
        let h = harness();

        assert!(!h.tracker.record_interaction(InteractionEvent::Click));
        assert_eq!(h.storage.get(keys::LAST_ACTIVITY), None);

        h.tracker.begin("abc", Some(Role::User), None);
        h.clock.advance(Duration::from_secs(90));
        assert!(h.tracker.record_interaction(InteractionEvent::KeyDown));
        assert_eq!(
            h.storage.get(keys::LAST_ACTIVITY),
            Some((T0 + 90_000).to_string())
        );
    }

    #[test]
    fn test_stale_check_clears_everything_and_redirects() {
        let h = harness();
        h.tracker.begin("abc", Some(Role::User), Some("ada"));
        h.clock.advance(Duration::from_secs(6 * 60));

        assert!(matches!(h.tracker.check(), InactivityCheck::Stale(_)));

        for key in keys::ALL {
            assert_eq!(h.storage.get(key), None, "{} not cleared", key);
        }
        assert_eq!(h.browser.notices(), vec![SESSION_EXPIRED_NOTICE.to_string()]);
        assert_eq!(h.browser.navigations(), vec![Destination::Login]);
        assert_eq!(h.tracker.phase(), SessionPhase::Anonymous);

        // Checking again finds nothing to expire
        assert_eq!(h.tracker.check(), InactivityCheck::NoSession);
        assert_eq!(h.browser.navigations().len(), 1);
    }

    #[test]
    fn test_activity_keeps_session_alive() {
        let h = harness();
        h.tracker.begin("abc", Some(Role::User), None);

        for _ in 0..10 {
            h.clock.advance(Duration::from_secs(4 * 60));
            h.tracker.record_interaction(InteractionEvent::PointerMove);
            assert_eq!(h.tracker.check(), InactivityCheck::Active);
        }
        assert!(h.browser.notices().is_empty());
    }

    #[test]
    fn test_logout_removes_token_only() {
        let h = harness();
        h.tracker.begin("abc", Some(Role::User), Some("ada"));
        h.tracker.logout();

        assert_eq!(h.storage.get(keys::TOKEN), None);
        assert_eq!(h.storage.get(keys::ROLE).as_deref(), Some("user"));
        assert_eq!(h.tracker.phase(), SessionPhase::Anonymous);
        assert!(h.browser.notices().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_periodic_check_expires_idle_session() {
        let h = harness();
        h.tracker.begin("abc", Some(Role::User), None);
        h.clock.advance(Duration::from_secs(6 * 60));
        let task = h.tracker.spawn_inactivity_checks();

        // Nothing runs until a full period has passed
        tokio::task::yield_now().await;
        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(h.storage.get(keys::TOKEN).as_deref(), Some("abc"));
        assert!(h.browser.navigations().is_empty());

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(h.storage.get(keys::TOKEN), None);
        assert_eq!(h.browser.navigations(), vec![Destination::Login]);
        task.abort();
    }

    #[tokio::test]
    async fn test_interaction_listener_refreshes() {
        let h = harness();
        h.tracker.begin("abc", Some(Role::User), None);
        h.clock.advance(Duration::from_secs(30));

        let (tx, rx) = mpsc::unbounded_channel();
        let task = h.tracker.spawn_interaction_listener(rx);
        tx.send(InteractionEvent::TouchStart).unwrap();
        drop(tx);
        task.await.unwrap();

        assert_eq!(
            h.storage.get(keys::LAST_ACTIVITY),
            Some((T0 + 30_000).to_string())
        );
    }
}
