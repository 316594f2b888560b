//! In-memory host emulation.
//!
//! A [`MemoryArea`] is one storage area shared by every execution context
//! attached to it, the way every open tab shares a browser's persistent
//! storage. Each [`MemoryBackend`] handle is one context: writes through it
//! are delivered as [`ChangeEvent`]s to every other attached handle, later,
//! when that handle drains its queue.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::rc::{Rc, Weak};

use tracing::trace;

use super::{Backend, BackendKind, Host};
use crate::error::BackendError;
use crate::events::ChangeEvent;

type Mailbox = Rc<RefCell<VecDeque<ChangeEvent>>>;

struct AreaState {
    kind: BackendKind,
    entries: BTreeMap<String, String>,
    /// Sum of key and value lengths, in bytes.
    usage: usize,
    quota: Option<usize>,
    accessible: bool,
    echo_to_writer: bool,
    contexts: Vec<(u64, Weak<RefCell<VecDeque<ChangeEvent>>>)>,
    next_context: u64,
}

impl AreaState {
    fn notify(&mut self, writer: u64, key: Option<&str>, old: Option<String>, new: Option<String>) {
        self.contexts.retain(|(_, mailbox)| mailbox.strong_count() > 0);
        for (id, mailbox) in &self.contexts {
            if *id == writer && !self.echo_to_writer {
                continue;
            }
            let Some(mailbox) = mailbox.upgrade() else {
                continue;
            };
            mailbox.borrow_mut().push_back(ChangeEvent {
                backend: self.kind,
                key: key.map(str::to_string),
                old_value: old.clone(),
                new_value: new.clone(),
                source: context_label(writer),
            });
        }
    }
}

fn context_label(id: u64) -> String {
    format!("context-{id}")
}

/// A storage area shared between contexts.
///
/// Cloning yields another handle to the same area.
#[derive(Clone)]
pub struct MemoryArea {
    state: Rc<RefCell<AreaState>>,
}

impl MemoryArea {
    /// An empty, unlimited area with no contexts attached.
    pub fn new(kind: BackendKind) -> Self {
        Self {
            state: Rc::new(RefCell::new(AreaState {
                kind,
                entries: BTreeMap::new(),
                usage: 0,
                quota: None,
                accessible: true,
                echo_to_writer: false,
                contexts: Vec::new(),
                next_context: 1,
            })),
        }
    }

    /// Limit the area to `limit` bytes of keys plus values.
    pub fn with_quota(self, limit: usize) -> Self {
        self.state.borrow_mut().quota = Some(limit);
        self
    }

    /// Also deliver change events to the context that made the write.
    ///
    /// Reproduces a host defect seen in one legacy browser.
    pub fn with_echo_to_writer(self, enabled: bool) -> Self {
        self.state.borrow_mut().echo_to_writer = enabled;
        self
    }

    /// Allow or deny access, as a host does in restricted contexts.
    ///
    /// While denied, every operation fails with
    /// [`BackendError::Unavailable`]. Entries are kept.
    pub fn set_accessible(&self, accessible: bool) {
        self.state.borrow_mut().accessible = accessible;
    }

    pub fn kind(&self) -> BackendKind {
        self.state.borrow().kind
    }

    fn check_access(&self) -> Result<(), BackendError> {
        let state = self.state.borrow();
        if state.accessible {
            Ok(())
        } else {
            Err(BackendError::Unavailable {
                message: format!("access to {} storage denied", state.kind),
            })
        }
    }

    /// Attach a new execution context to this area.
    pub fn attach(&self) -> MemoryBackend {
        let mailbox: Mailbox = Rc::new(RefCell::new(VecDeque::new()));
        let mut state = self.state.borrow_mut();
        let id = state.next_context;
        state.next_context += 1;
        state.contexts.push((id, Rc::downgrade(&mailbox)));
        MemoryBackend {
            area: self.clone(),
            id,
            mailbox,
        }
    }

    /// Raw value stored under `key`, bypassing any context.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.state.borrow().entries.get(key).cloned()
    }

    /// Copy of every raw entry.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.state.borrow().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.state.borrow().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One context's handle onto a [`MemoryArea`].
pub struct MemoryBackend {
    area: MemoryArea,
    id: u64,
    mailbox: Mailbox,
}

impl MemoryBackend {
    /// Label carried in [`ChangeEvent::source`] for writes from this handle.
    pub fn source(&self) -> String {
        context_label(self.id)
    }

    pub fn area(&self) -> &MemoryArea {
        &self.area
    }
}

impl Backend for MemoryBackend {
    fn kind(&self) -> BackendKind {
        self.area.kind()
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, BackendError> {
        self.area.check_access()?;
        Ok(self.area.raw(key))
    }

    fn set_item(&mut self, key: &str, value: &str) -> Result<(), BackendError> {
        self.area.check_access()?;
        let mut state = self.area.state.borrow_mut();
        let old = state.entries.get(key).cloned();
        let freed = old.as_ref().map_or(0, |v| key.len() + v.len());
        let usage = state.usage - freed + key.len() + value.len();
        if let Some(limit) = state.quota {
            if usage > limit {
                return Err(BackendError::QuotaExceeded {
                    key: key.to_string(),
                    limit,
                });
            }
        }
        state.usage = usage;
        state.entries.insert(key.to_string(), value.to_string());
        trace!(backend = %state.kind, key, usage, "set item");
        state.notify(self.id, Some(key), old, Some(value.to_string()));
        Ok(())
    }

    fn remove_item(&mut self, key: &str) -> Result<(), BackendError> {
        self.area.check_access()?;
        let mut state = self.area.state.borrow_mut();
        let Some(old) = state.entries.remove(key) else {
            return Ok(());
        };
        state.usage -= key.len() + old.len();
        trace!(backend = %state.kind, key, "removed item");
        state.notify(self.id, Some(key), Some(old), None);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), BackendError> {
        self.area.check_access()?;
        let mut state = self.area.state.borrow_mut();
        if state.entries.is_empty() {
            return Ok(());
        }
        state.entries.clear();
        state.usage = 0;
        state.notify(self.id, None, None, None);
        Ok(())
    }

    fn len(&self) -> Result<usize, BackendError> {
        self.area.check_access()?;
        Ok(self.area.len())
    }

    fn key(&self, index: usize) -> Result<Option<String>, BackendError> {
        self.area.check_access()?;
        Ok(self.area.state.borrow().entries.keys().nth(index).cloned())
    }

    fn keys(&self) -> Result<Vec<String>, BackendError> {
        self.area.check_access()?;
        Ok(self.area.state.borrow().entries.keys().cloned().collect())
    }

    fn take_changes(&mut self) -> Vec<ChangeEvent> {
        self.mailbox.borrow_mut().drain(..).collect()
    }
}

/// A host whose backends are in-memory areas.
///
/// Each host is one context: its session area is private, while its
/// persistent area can be shared with other hosts via [`MemoryHost::sharing`].
pub struct MemoryHost {
    session: MemoryArea,
    persistent: MemoryArea,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self {
            session: MemoryArea::new(BackendKind::Session),
            persistent: MemoryArea::new(BackendKind::Persistent),
        }
    }

    /// A new context sharing `other`'s persistent area with a fresh session.
    pub fn sharing(other: &MemoryHost) -> Self {
        Self {
            session: MemoryArea::new(BackendKind::Session),
            persistent: other.persistent.clone(),
        }
    }

    /// A host built from explicit areas.
    pub fn with_areas(session: MemoryArea, persistent: MemoryArea) -> Self {
        Self { session, persistent }
    }

    pub fn session_area(&self) -> &MemoryArea {
        &self.session
    }

    pub fn persistent_area(&self) -> &MemoryArea {
        &self.persistent
    }
}

impl Default for MemoryHost {
    fn default() -> Self {
        Self::new()
    }
}

impl Host for MemoryHost {
    fn session_backend(&self) -> Option<Box<dyn Backend>> {
        Some(Box::new(self.session.attach()))
    }

    fn persistent_backend(&self) -> Option<Box<dyn Backend>> {
        Some(Box::new(self.persistent.attach()))
    }
}
