use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, trace};

use crate::backend::{Backend, BackendKind};
use crate::config::StoreConfig;
use crate::error::Result;
use crate::events::{EchoFilter, Emitter, Event, HandlerId};
use crate::key::{namespace_prefix, EntryKey};

/// A live store: a backend plus everything layered on top of it.
struct Active {
    backend: Box<dyn Backend>,
    separator: char,
    emitter: Emitter,
    echo: Option<EchoFilter>,
}

/// Namespaced JSON store over one backend.
///
/// A store built without a backend is inert: reads return `None`, writes and
/// subscriptions do nothing, and nothing fails. Callers never need to check
/// whether the host supports storage.
pub struct Store {
    kind: BackendKind,
    active: Option<Active>,
}

impl Store {
    /// A live store over `backend`, using the separator and echo settings
    /// from `config`.
    pub fn new(backend: Box<dyn Backend>, config: &StoreConfig) -> Self {
        let echo = config
            .echo_suppression
            .then(|| EchoFilter::new(config.echo_history));
        Self {
            kind: backend.kind(),
            active: Some(Active {
                backend,
                separator: config.separator,
                emitter: Emitter::new(),
                echo,
            }),
        }
    }

    /// A store whose every operation is a no-op.
    pub fn inert(kind: BackendKind) -> Self {
        Self { kind, active: None }
    }

    /// Which backend this store wraps.
    pub fn kind(&self) -> BackendKind {
        self.kind
    }

    /// Whether this store is a no-op because the host has no storage.
    pub fn is_inert(&self) -> bool {
        self.active.is_none()
    }

    /// Read and decode the value under `key`.
    ///
    /// Returns `None` both when nothing is stored and when the stored value
    /// is JSON `null`; the two cases are indistinguishable.
    pub fn get<'k, T: DeserializeOwned>(
        &self,
        key: impl Into<EntryKey<'k>>,
    ) -> Result<Option<T>> {
        let Some(active) = &self.active else {
            return Ok(None);
        };
        let key = key.into();
        key.validate(active.separator)?;
        let composite = key.composite(active.separator);
        trace!(backend = %self.kind, key = %composite, "get");
        match active.backend.get_item(&composite)? {
            Some(raw) => Ok(serde_json::from_str::<Option<T>>(&raw)?),
            None => Ok(None),
        }
    }

    /// Encode `value` as JSON and store it under `key`.
    ///
    /// A value that encodes to JSON `null` removes the entry instead, exactly
    /// like [`Store::del`]. That covers `None` and `()`, and also non-finite
    /// floats (`NaN`, infinities), which serde_json encodes as `null`.
    ///
    /// On error nothing is written.
    pub fn set<'k, T: Serialize + ?Sized>(
        &mut self,
        key: impl Into<EntryKey<'k>>,
        value: &T,
    ) -> Result<()> {
        let Some(active) = &mut self.active else {
            return Ok(());
        };
        let key = key.into();
        key.validate(active.separator)?;
        let composite = key.composite(active.separator);
        let raw = serde_json::to_string(value)?;
        if raw == "null" {
            return active.remove(self.kind, &composite);
        }
        active.backend.set_item(&composite, &raw)?;
        if let Some(echo) = &mut active.echo {
            echo.record(&composite, &raw);
        }
        debug!(backend = %self.kind, key = %composite, bytes = raw.len(), "stored entry");
        Ok(())
    }

    /// Remove the entry under `key`. Removing a missing entry is not an error.
    pub fn del<'k>(&mut self, key: impl Into<EntryKey<'k>>) -> Result<()> {
        let Some(active) = &mut self.active else {
            return Ok(());
        };
        let key = key.into();
        key.validate(active.separator)?;
        let composite = key.composite(active.separator);
        active.remove(self.kind, &composite)
    }

    /// Remove every entry in `namespace`, or the whole backend when `None`.
    ///
    /// Only composite keys starting with `<namespace><separator>` are
    /// removed, so clearing `foo` leaves `foobar:*` alone. Removal is one
    /// key at a time and not atomic. An empty namespace means no namespace.
    pub fn clear(&mut self, namespace: Option<&str>) -> Result<()> {
        let Some(active) = &mut self.active else {
            return Ok(());
        };
        match namespace.filter(|ns| !ns.is_empty()) {
            None => {
                if let Some(echo) = &mut active.echo {
                    echo.reset();
                }
                active.backend.clear()?;
                debug!(backend = %self.kind, "cleared backend");
            }
            Some(ns) => {
                let prefix = namespace_prefix(ns, active.separator);
                let doomed: Vec<String> = active
                    .backend
                    .keys()?
                    .into_iter()
                    .filter(|k| k.starts_with(&prefix))
                    .collect();
                active.backend.remove_items(&doomed)?;
                if let Some(echo) = &mut active.echo {
                    for key in &doomed {
                        echo.forget(key);
                    }
                }
                debug!(
                    backend = %self.kind,
                    namespace = ns,
                    removed = doomed.len(),
                    "cleared namespace"
                );
            }
        }
        Ok(())
    }

    /// Keys stored in `namespace` with the prefix stripped, or every
    /// composite key when `None`.
    pub fn keys(&self, namespace: Option<&str>) -> Result<Vec<String>> {
        let Some(active) = &self.active else {
            return Ok(Vec::new());
        };
        let keys = active.backend.keys()?;
        Ok(match namespace.filter(|ns| !ns.is_empty()) {
            None => keys,
            Some(ns) => {
                let prefix = namespace_prefix(ns, active.separator);
                keys.into_iter()
                    .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
                    .collect()
            }
        })
    }

    /// Register a handler for events named `name` on this store.
    ///
    /// Returns None on an inert store.
    pub fn on(&mut self, name: &str, handler: impl FnMut(&Event) + 'static) -> Option<HandlerId> {
        let active = self.active.as_mut()?;
        Some(active.emitter.on(name, handler))
    }

    /// Register a handler that runs on the next `name` event only.
    pub fn once(&mut self, name: &str, handler: impl FnMut(&Event) + 'static) -> Option<HandlerId> {
        let active = self.active.as_mut()?;
        Some(active.emitter.once(name, handler))
    }

    /// Unregister one handler, or all handlers for `name` when `id` is None.
    pub fn off(&mut self, name: &str, id: Option<HandlerId>) -> usize {
        match &mut self.active {
            Some(active) => active.emitter.off(name, id),
            None => 0,
        }
    }

    /// Dispatch `event` to this store's handlers. Returns how many ran.
    pub fn emit(&mut self, event: &Event) -> usize {
        match &mut self.active {
            Some(active) => active.emitter.emit(event),
            None => 0,
        }
    }

    /// Emit a named event carrying an optional JSON payload.
    pub fn trigger(&mut self, name: &str, data: Option<serde_json::Value>) -> usize {
        let mut event = Event::new(name);
        event.data = data;
        self.emit(&event)
    }

    /// Re-emit the backend's pending native change notifications as
    /// [`STORAGE_EVENT`](crate::events::STORAGE_EVENT) events.
    ///
    /// With echo suppression enabled, notifications matching one of this
    /// store's own recent writes are dropped. Removals and full clears are
    /// always emitted. Returns how many were emitted.
    pub fn dispatch_changes(&mut self) -> usize {
        let Some(active) = &mut self.active else {
            return 0;
        };
        let mut dispatched = 0;
        for change in active.backend.take_changes() {
            if let (Some(echo), Some(key), Some(value)) = (
                &active.echo,
                change.key.as_deref(),
                change.new_value.as_deref(),
            ) {
                if echo.matches(key, value) {
                    debug!(backend = %self.kind, key, "dropped echo of own write");
                    continue;
                }
            }
            active.emitter.emit(&Event::storage(change));
            dispatched += 1;
        }
        dispatched
    }
}

impl Active {
    fn remove(&mut self, kind: BackendKind, composite: &str) -> Result<()> {
        self.backend.remove_item(composite)?;
        if let Some(echo) = &mut self.echo {
            echo.forget(composite);
        }
        debug!(backend = %kind, key = composite, "removed entry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::rc::Rc;

    use serde_json::{json, Value};

    use super::*;
    use crate::backend::MemoryArea;
    use crate::error::StoreError;
    use crate::events::STORAGE_EVENT;

    fn store(area: &MemoryArea) -> Store {
        Store::new(Box::new(area.attach()), &StoreConfig::default())
    }

    #[test]
    fn set_writes_raw_json_under_composite_key() {
        let area = MemoryArea::new(BackendKind::Persistent);
        let mut s = store(&area);
        s.set(("app", "theme"), "dark").unwrap();
        assert_eq!(area.raw("app:theme").as_deref(), Some("\"dark\""));
        assert_eq!(
            s.get::<String>(("app", "theme")).unwrap().as_deref(),
            Some("dark")
        );
    }

    #[test]
    fn null_set_deletes() {
        let area = MemoryArea::new(BackendKind::Session);
        let mut s = store(&area);
        s.set("k", &1).unwrap();
        s.set("k", &Value::Null).unwrap();
        assert!(area.is_empty());
        s.set("k", &1).unwrap();
        s.set("k", &None::<i32>).unwrap();
        assert!(area.is_empty());
    }

    #[test]
    fn stored_null_reads_as_none() {
        let area = MemoryArea::new(BackendKind::Session);
        area.attach().set_item("k", "null").unwrap();
        let s = store(&area);
        assert_eq!(s.get::<i32>("k").unwrap(), None);
    }

    #[test]
    fn corrupt_value_is_a_json_error() {
        let area = MemoryArea::new(BackendKind::Session);
        area.attach().set_item("k", "{not json").unwrap();
        let s = store(&area);
        assert!(matches!(s.get::<Value>("k"), Err(StoreError::Json(_))));
    }

    #[test]
    fn custom_separator_is_used() {
        let area = MemoryArea::new(BackendKind::Session);
        let config = StoreConfig::default().with_separator('/');
        let mut s = Store::new(Box::new(area.attach()), &config);
        s.set(("ns", "a:b"), &true).unwrap();
        assert_eq!(area.raw("ns/a:b").as_deref(), Some("true"));
        assert!(matches!(
            s.set(("ns", "a/b"), &true),
            Err(StoreError::KeyFormat { separator: '/', .. })
        ));
    }

    #[test]
    fn keys_strip_namespace_prefix() {
        let area = MemoryArea::new(BackendKind::Session);
        let mut s = store(&area);
        s.set(("app", "b"), &1).unwrap();
        s.set(("app", "a"), &1).unwrap();
        s.set(("apple", "c"), &1).unwrap();
        s.set("top", &1).unwrap();
        assert_eq!(s.keys(Some("app")).unwrap(), ["a", "b"]);
        assert_eq!(s.keys(None).unwrap(), ["app:a", "app:b", "apple:c", "top"]);
    }

    #[test]
    fn trigger_reaches_handlers() {
        let area = MemoryArea::new(BackendKind::Session);
        let mut s = store(&area);
        let hits = Rc::new(RefCell::new(0));
        let counter = hits.clone();
        let id = s.on("saved", move |_| *counter.borrow_mut() += 1).unwrap();
        assert_eq!(s.trigger("saved", Some(json!(1))), 1);
        assert_eq!(s.off("saved", Some(id)), 1);
        assert_eq!(s.trigger("saved", None), 0);
        assert_eq!(*hits.borrow(), 1);
    }

    #[test]
    fn echo_filter_drops_own_writes() {
        let area = MemoryArea::new(BackendKind::Persistent).with_echo_to_writer(true);
        let config = StoreConfig::default().with_echo_suppression(true);
        let mut s = Store::new(Box::new(area.attach()), &config);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        s.on(STORAGE_EVENT, move |e| sink.borrow_mut().push(e.change.clone()));

        s.set("k", &1).unwrap();
        assert_eq!(s.dispatch_changes(), 0);

        // A different context writing the same key still gets through.
        area.attach().set_item("k", "2").unwrap();
        assert_eq!(s.dispatch_changes(), 1);
        assert_eq!(seen.borrow().len(), 1);

        // Removals are never treated as echoes.
        s.del("k").unwrap();
        assert_eq!(s.dispatch_changes(), 1);
    }

    #[test]
    fn echo_filter_keeps_foreign_removals() {
        let area = MemoryArea::new(BackendKind::Persistent).with_echo_to_writer(true);
        let config = StoreConfig::default().with_echo_suppression(true);
        let mut s = Store::new(Box::new(area.attach()), &config);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = seen.clone();
        s.on(STORAGE_EVENT, move |e| {
            let change = e.change.clone().unwrap();
            sink.borrow_mut().push((change.key, change.new_value));
        });

        // Deleting a key that was never stored fires nothing here.
        s.del("k").unwrap();
        let mut other = area.attach();
        other.set_item("k", "1").unwrap();
        other.remove_item("k").unwrap();

        assert_eq!(s.dispatch_changes(), 2);
        assert_eq!(
            *seen.borrow(),
            [
                (Some("k".to_string()), Some("1".to_string())),
                (Some("k".to_string()), None),
            ]
        );
    }

    #[test]
    fn delete_evicts_earlier_write_from_echo_history() {
        let area = MemoryArea::new(BackendKind::Persistent);
        let config = StoreConfig::default().with_echo_suppression(true);
        let mut s = Store::new(Box::new(area.attach()), &config);
        s.set("k", &1).unwrap();
        s.del("k").unwrap();

        // Another context storing the value we once wrote is not our echo.
        area.attach().set_item("k", "1").unwrap();
        assert_eq!(s.dispatch_changes(), 1);
    }

    #[test]
    fn non_finite_floats_delete() {
        let area = MemoryArea::new(BackendKind::Session);
        let mut s = store(&area);
        s.set("k", &1.5).unwrap();
        s.set("k", &f64::NAN).unwrap();
        assert_eq!(area.raw("k"), None);
        s.set("k", &1.5).unwrap();
        s.set("k", &f64::INFINITY).unwrap();
        assert!(area.is_empty());
    }

    #[test]
    fn echoes_pass_without_suppression() {
        let area = MemoryArea::new(BackendKind::Persistent).with_echo_to_writer(true);
        let mut s = store(&area);
        s.set("k", &1).unwrap();
        assert_eq!(s.dispatch_changes(), 1);
    }

    #[test]
    fn full_clear_resets_echo_history() {
        let area = MemoryArea::new(BackendKind::Persistent).with_echo_to_writer(true);
        let config = StoreConfig::default().with_echo_suppression(true);
        let mut s = Store::new(Box::new(area.attach()), &config);
        s.set("k", &1).unwrap();
        s.clear(None).unwrap();
        // The set echo is now unrecognised; the keyless clear event is never filtered.
        assert_eq!(s.dispatch_changes(), 2);
    }
}
