use crate::gateway::remote::SocialRemote;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub enum ApiStatus {
    #[default]
    Checking,
    Connected,
    Disconnected,
}

/// Shared reachability flag of the backend.
#[derive(Debug)]
pub struct Connectivity {
    status: watch::Sender<ApiStatus>,
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

impl Connectivity {
    #[must_use]
    pub fn new() -> Self {
        Self {
            status: watch::Sender::new(ApiStatus::Checking),
        }
    }

    #[must_use]
    pub fn status(&self) -> ApiStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn is_disconnected(&self) -> bool {
        self.status() == ApiStatus::Disconnected
    }

    pub fn set(&self, status: ApiStatus) {
        let previous = self.status.send_replace(status);
        if previous != status {
            debug!(?previous, current = ?status, "Connectivity changed");
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<ApiStatus> {
        self.status.subscribe()
    }
}

/// Asks the backend's liveness endpoint whether it is reachable.
///
/// Never retries on its own.
pub async fn probe(remote: &dyn SocialRemote, connectivity: &Connectivity) -> bool {
    match remote.health().await {
        Ok(()) => {
            info!("Backend reachable");
            connectivity.set(ApiStatus::Connected);
            true
        }
        Err(err) => {
            warn!(error = %err, "Backend unreachable");
            connectivity.set(ApiStatus::Disconnected);
            false
        }
    }
}
