//! Navigation and user notices, the two side effects the session code has

use crate::auth::models::Role;
use parking_lot::Mutex;
use tracing::info;

/// Fixed redirect targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Login,
    UserDashboard,
    VendorDashboard,
}

impl Destination {
    pub fn path(&self) -> &'static str {
        match self {
            Destination::Login => "/loginPage.html",
            Destination::UserDashboard => "/user/user-dashboard.html",
            Destination::VendorDashboard => "/vendor/vendor-dashboard.html",
        }
    }

    /// Dashboard for a stored role string; unknown or missing roles go to login
    pub fn for_role(role: Option<&str>) -> Self {
        match role.and_then(Role::parse) {
            Some(Role::User) => Destination::UserDashboard,
            Some(Role::Vendor) => Destination::VendorDashboard,
            None => Destination::Login,
        }
    }
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, to: Destination);
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str);
}

/// Records navigations and notices; stands in for a real window in
/// headless runs and tests
#[derive(Debug, Default)]
pub struct RecordingBrowser {
    navigations: Mutex<Vec<Destination>>,
    notices: Mutex<Vec<String>>,
}

impl RecordingBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn navigations(&self) -> Vec<Destination> {
        self.navigations.lock().clone()
    }

    pub fn last_navigation(&self) -> Option<Destination> {
        self.navigations.lock().last().copied()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.lock().clone()
    }
}

impl Navigator for RecordingBrowser {
    fn navigate(&self, to: Destination) {
        info!(to = to.path(), "Navigate");
        self.navigations.lock().push(to);
    }
}

impl Notifier for RecordingBrowser {
    fn notify(&self, message: &str) {
        info!(message, "Notice");
        self.notices.lock().push(message.to_string());
    }
}
