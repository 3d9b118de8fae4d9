//! UI Auth Glue
//! Mission: Keep the login/logout link, identity display and profile routing
//! in step with whatever the session keys say right now.

use crate::session::{
    browser::Destination,
    storage::{keys, StorageEvent, StorageEvents},
    tracker::{SessionState, SessionTracker},
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use parking_lot::RwLock;
use serde_json::Value;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthLink {
    #[default]
    Login,
    Logout,
}

impl AuthLink {
    pub fn label(&self) -> &'static str {
        match self {
            AuthLink::Login => "LOGIN",
            AuthLink::Logout => "LOGOUT",
        }
    }
}

/// What the page currently shows
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthView {
    pub identity: Option<String>,
    pub auth_link: AuthLink,
}

/// Display identity for a stored token: the `email` claim of a JWT payload,
/// otherwise the stored string itself. The signature is not checked here.
pub fn display_identity(token: &str) -> String {
    decode_email_claim(token).unwrap_or_else(|| token.to_string())
}

fn decode_email_claim(token: &str) -> Option<String> {
    let mut segments = token.split('.');
    let (_, payload, _) = (segments.next()?, segments.next()?, segments.next()?);
    if segments.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .ok()?;
    let claims: Value = serde_json::from_slice(&bytes).ok()?;
    claims.get("email")?.as_str().map(str::to_string)
}

pub struct AuthUi {
    tracker: Arc<SessionTracker>,
    view: RwLock<AuthView>,
}

impl AuthUi {
    pub fn new(tracker: Arc<SessionTracker>) -> Self {
        Self {
            tracker,
            view: RwLock::new(AuthView::default()),
        }
    }

    pub fn view(&self) -> AuthView {
        self.view.read().clone()
    }

    /// Show the stored identity, or wipe a missing/stale session and show
    /// nothing. Returns whether an authenticated session is displayed.
    pub fn render_identity(&self) -> bool {
        let ctx = self.tracker.context();
        let state = SessionState::load(ctx.storage.as_ref());
        let stale = state
            .staleness(ctx.clock.now_ms(), ctx.config.inactivity_limit)
            .is_some();

        let identity = match state.token.as_deref() {
            Some(token) if !stale => Some(display_identity(token)),
            _ => {
                for key in keys::ALL {
                    ctx.storage.remove(key);
                }
                None
            }
        };

        let shown = identity.is_some();
        self.view.write().identity = identity;
        shown
    }

    pub fn render_auth_link(&self) {
        let link = if self.tracker.state().has_token() {
            AuthLink::Logout
        } else {
            AuthLink::Login
        };
        self.view.write().auth_link = link;
    }

    fn render(&self) {
        self.render_identity();
        self.render_auth_link();
    }

    /// LOGOUT logs out in place; LOGIN goes to the login page
    pub fn on_auth_link_activated(&self) {
        if self.tracker.state().has_token() {
            self.tracker.logout();
            self.render();
        } else {
            self.tracker.context().navigator.navigate(Destination::Login);
        }
    }

    /// Profile icon: role dashboard for a live session, login otherwise
    pub fn on_profile_activated(&self) {
        let state = self.tracker.state();
        let to = if state.has_token() {
            Destination::for_role(state.role.as_deref())
        } else {
            Destination::Login
        };
        self.tracker.context().navigator.navigate(to);
    }

    pub fn on_page_load(&self) {
        self.render();
    }

    pub fn on_menu_opened(&self) {
        self.render();
    }

    /// Re-render when another tab touched the token; returns whether it did
    pub fn on_storage_event(&self, event: &StorageEvent) -> bool {
        if !event.affects(keys::TOKEN) {
            return false;
        }
        debug!(source = event.source, "Token changed in another tab");
        self.render();
        true
    }

    /// Apply cross-tab changes as they arrive
    pub fn spawn_storage_listener(self: &Arc<Self>, mut events: StorageEvents) -> JoinHandle<()> {
        let ui = Arc::clone(self);
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                ui.on_storage_event(&event);
            }
        })
    }
}
