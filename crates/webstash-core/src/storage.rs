use tracing::warn;

use crate::backend::{BackendKind, Host};
use crate::config::StoreConfig;
use crate::store::Store;

/// The session and persistent stores of one execution context.
pub struct WebStorage {
    session: Store,
    persistent: Store,
    config: StoreConfig,
}

impl WebStorage {
    /// Build both stores from `host`.
    ///
    /// If the host lacks either backend, both stores are inert.
    pub fn new(host: &dyn Host, config: StoreConfig) -> Self {
        match (host.session_backend(), host.persistent_backend()) {
            (Some(session), Some(persistent)) => Self {
                session: Store::new(session, &config),
                persistent: Store::new(persistent, &config),
                config,
            },
            _ => {
                warn!("host storage unavailable; all operations are no-ops");
                Self::inert_with(config)
            }
        }
    }

    /// Both stores inert.
    pub fn inert() -> Self {
        Self::inert_with(StoreConfig::default())
    }

    fn inert_with(config: StoreConfig) -> Self {
        Self {
            session: Store::inert(BackendKind::Session),
            persistent: Store::inert(BackendKind::Persistent),
            config,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The session-scoped store.
    pub fn session(&mut self) -> &mut Store {
        &mut self.session
    }

    /// The store that survives restarts.
    pub fn persistent(&mut self) -> &mut Store {
        &mut self.persistent
    }

    /// Alias for [`WebStorage::persistent`].
    pub fn local(&mut self) -> &mut Store {
        &mut self.persistent
    }

    pub fn store(&mut self, kind: BackendKind) -> &mut Store {
        match kind {
            BackendKind::Session => &mut self.session,
            BackendKind::Persistent => &mut self.persistent,
        }
    }

    /// Dispatch pending native change notifications on both stores.
    pub fn dispatch_changes(&mut self) -> usize {
        self.session.dispatch_changes() + self.persistent.dispatch_changes()
    }
}
