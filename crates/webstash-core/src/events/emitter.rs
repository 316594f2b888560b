use std::collections::HashMap;

use super::Event;

/// Identifies a registered handler, for use with [`Emitter::off`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

type Handler = Box<dyn FnMut(&Event)>;

struct Listener {
    id: HandlerId,
    once: bool,
    handler: Handler,
}

/// Listener table keyed by event name.
///
/// Handlers for one name run in registration order.
#[derive(Default)]
pub struct Emitter {
    listeners: HashMap<String, Vec<Listener>>,
    next_id: u64,
}

impl Emitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events named `name`.
    pub fn on(&mut self, name: &str, handler: impl FnMut(&Event) + 'static) -> HandlerId {
        self.register(name, false, Box::new(handler))
    }

    /// Register `handler` to run on the next `name` event only.
    pub fn once(&mut self, name: &str, handler: impl FnMut(&Event) + 'static) -> HandlerId {
        self.register(name, true, Box::new(handler))
    }

    /// Unregister one handler, or every handler for `name` when `id` is None.
    ///
    /// Returns how many handlers were removed.
    pub fn off(&mut self, name: &str, id: Option<HandlerId>) -> usize {
        let Some(listeners) = self.listeners.get_mut(name) else {
            return 0;
        };
        let before = listeners.len();
        match id {
            Some(id) => listeners.retain(|l| l.id != id),
            None => listeners.clear(),
        }
        let removed = before - listeners.len();
        if listeners.is_empty() {
            self.listeners.remove(name);
        }
        removed
    }

    /// Invoke every handler registered for `event.name`.
    ///
    /// `once` handlers are unregistered before they run. Returns how many
    /// handlers ran.
    pub fn emit(&mut self, event: &Event) -> usize {
        let Some(listeners) = self.listeners.get_mut(&event.name) else {
            return 0;
        };
        let mut ran = 0;
        let mut kept = Vec::with_capacity(listeners.len());
        for mut listener in listeners.drain(..) {
            (listener.handler)(event);
            ran += 1;
            if !listener.once {
                kept.push(listener);
            }
        }
        if kept.is_empty() {
            self.listeners.remove(&event.name);
        } else {
            *listeners = kept;
        }
        ran
    }

    /// Number of handlers registered for `name`.
    pub fn listener_count(&self, name: &str) -> usize {
        self.listeners.get(name).map_or(0, Vec::len)
    }

    fn register(&mut self, name: &str, once: bool, handler: Handler) -> HandlerId {
        self.next_id += 1;
        let id = HandlerId(self.next_id);
        self.listeners
            .entry(name.to_string())
            .or_default()
            .push(Listener { id, once, handler });
        id
    }
}
