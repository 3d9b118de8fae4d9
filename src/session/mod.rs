//! Session Module
//! Mission: Client-side session lifecycle: activity tracking, inactivity
//! expiry, cross-tab sync and the auth-dependent bits of the page

pub mod browser;
pub mod clock;
pub mod storage;
pub mod tracker;
pub mod ui;

pub use browser::{Destination, Navigator, Notifier, RecordingBrowser};
pub use clock::{Clock, ManualClock, SystemClock};
pub use storage::{keys, MemoryStorage, SessionStorage, SharedStorage, StorageEvent, TabStorage};
pub use tracker::{
    InactivityCheck, InteractionEvent, SessionConfig, SessionContext, SessionPhase, SessionState,
    SessionTracker,
};
pub use ui::{AuthLink, AuthUi, AuthView};
