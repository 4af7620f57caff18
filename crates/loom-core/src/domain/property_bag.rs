//! Typed, change-notifying key/value store.
//!
//! [`PropertyBag`] is the base of every stateful object in the substrate.
//! Writes go through [`PropertyBag::set_value`], which:
//!
//! 1. compares the new value with the stored one (equal ⇒ silent no-op)
//! 2. raises a cancelable [`PropertyChanging`] notification
//! 3. writes, marks the bag dirty and raises [`PropertyChanged`]
//!
//! Observers are plain closures keyed by an [`ObserverId`] so a decorator can
//! unregister exactly the observer it installed on its host.

use std::collections::BTreeMap;
use std::fmt;

use tracing::trace;

use crate::domain::{
    error::DomainError,
    value::{FromValue, Value},
};

/// Prefix reserved for persistence bookkeeping keys (`$id`, `$decorators`).
pub const RESERVED_PREFIX: char = '$';

/// Cancelable notification raised before a property is written.
#[derive(Debug)]
pub struct PropertyChanging<'a> {
    pub name: &'a str,
    pub old: Option<&'a Value>,
    pub new: &'a Value,
    /// Set to `true` to veto the write.
    pub cancel: bool,
}

/// Notification raised after a property was written.
#[derive(Debug, Clone, Copy)]
pub struct PropertyChanged<'a> {
    pub name: &'a str,
    pub old: Option<&'a Value>,
    pub new: &'a Value,
}

/// Handle returned when registering an observer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

type ChangingObserver = Box<dyn FnMut(&mut PropertyChanging<'_>) + Send + Sync>;
type ChangedObserver = Box<dyn FnMut(&PropertyChanged<'_>) + Send + Sync>;

#[derive(Default)]
struct Observers {
    next_id: u64,
    changing: Vec<(ObserverId, ChangingObserver)>,
    changed: Vec<(ObserverId, ChangedObserver)>,
}

impl Observers {
    fn allocate(&mut self) -> ObserverId {
        self.next_id += 1;
        ObserverId(self.next_id)
    }
}

/// Generic property store.
#[derive(Default)]
pub struct PropertyBag {
    values: BTreeMap<String, Value>,
    dirty: bool,
    observers: Observers,
}

impl PropertyBag {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a bag from an existing map without raising notifications.
    pub fn from_map(values: BTreeMap<String, Value>) -> Self {
        Self {
            values,
            dirty: false,
            observers: Observers::default(),
        }
    }

    /// Typed read; falls back to `default` when missing or of another kind.
    pub fn get_value<T: FromValue>(&self, name: &str, default: T) -> T {
        self.values
            .get(name)
            .and_then(T::from_value)
            .unwrap_or(default)
    }

    /// Typed read that reports a kind mismatch instead of defaulting.
    pub fn try_get<T: FromValue>(&self, name: &str) -> Result<Option<T>, DomainError> {
        match self.values.get(name) {
            None => Ok(None),
            Some(value) => T::from_value(value)
                .map(Some)
                .ok_or_else(|| DomainError::TypeMismatch {
                    property: name.to_string(),
                    expected: T::KIND,
                    actual: value.kind_name(),
                }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Write a property.
    ///
    /// Returns `true` only when the stored value actually changed. Unchanged
    /// values and vetoed writes return `false` and leave the bag untouched.
    /// Reserved names (leading `$`) are rejected.
    pub fn set_value(&mut self, name: &str, value: impl Into<Value>) -> bool {
        let value = value.into();
        if name.starts_with(RESERVED_PREFIX) {
            tracing::warn!(property = name, "Refusing to write reserved property");
            return false;
        }
        if self.values.get(name) == Some(&value) {
            return false;
        }

        let mut changing = PropertyChanging {
            name,
            old: self.values.get(name),
            new: &value,
            cancel: false,
        };
        for (_, observer) in self.observers.changing.iter_mut() {
            observer(&mut changing);
        }
        if changing.cancel {
            trace!(property = name, "Property change vetoed");
            return false;
        }

        let old = self.values.insert(name.to_string(), value);
        self.dirty = true;

        let new = &self.values[name];
        let changed = PropertyChanged {
            name,
            old: old.as_ref(),
            new,
        };
        for (_, observer) in self.observers.changed.iter_mut() {
            observer(&changed);
        }
        true
    }

    /// Remove a property, returning its former value. Raises no notifications.
    pub fn remove(&mut self, name: &str) -> Option<Value> {
        let removed = self.values.remove(name);
        if removed.is_some() {
            self.dirty = true;
        }
        removed
    }

    /// Iterate properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copy of the whole property map.
    pub fn to_map(&self) -> BTreeMap<String, Value> {
        self.values.clone()
    }

    /// Replace the whole property map (no merge) and reset the dirty flag.
    ///
    /// Observers are kept; no notifications are raised.
    pub fn replace_all(&mut self, values: BTreeMap<String, Value>) {
        self.values = values;
        self.dirty = false;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }

    /// Register a cancelable observer for writes.
    pub fn on_changing(
        &mut self,
        observer: impl FnMut(&mut PropertyChanging<'_>) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = self.observers.allocate();
        self.observers.changing.push((id, Box::new(observer)));
        id
    }

    /// Register an observer for committed writes.
    pub fn on_changed(
        &mut self,
        observer: impl FnMut(&PropertyChanged<'_>) + Send + Sync + 'static,
    ) -> ObserverId {
        let id = self.observers.allocate();
        self.observers.changed.push((id, Box::new(observer)));
        id
    }

    /// Remove an observer. Unknown ids are ignored.
    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        let before = self.observers.changing.len() + self.observers.changed.len();
        self.observers.changing.retain(|(oid, _)| *oid != id);
        self.observers.changed.retain(|(oid, _)| *oid != id);
        before != self.observers.changing.len() + self.observers.changed.len()
    }

    pub fn observer_count(&self) -> usize {
        self.observers.changing.len() + self.observers.changed.len()
    }
}

impl fmt::Debug for PropertyBag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PropertyBag")
            .field("values", &self.values)
            .field("dirty", &self.dirty)
            .field("observers", &self.observer_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    #[test]
    fn unchanged_value_is_silent_noop() {
        let mut bag = PropertyBag::new();
        assert!(bag.set_value("name", "a"));
        bag.mark_clean();

        let calls = Arc::new(AtomicUsize::new(0));
        let c1 = calls.clone();
        let c2 = calls.clone();
        bag.on_changing(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        });
        bag.on_changed(move |_| {
            c2.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!bag.set_value("name", "a"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!bag.is_dirty());
    }

    #[test]
    fn veto_keeps_previous_value() {
        let mut bag = PropertyBag::new();
        bag.set_value("count", 1);
        bag.on_changing(|change| change.cancel = true);

        assert!(!bag.set_value("count", 2));
        assert_eq!(bag.get_value("count", 0_i64), 1);
    }

    #[test]
    fn changed_observer_sees_old_and_new() {
        let mut bag = PropertyBag::new();
        bag.set_value("count", 1);

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = seen.clone();
        bag.on_changed(move |change| {
            sink.lock()
                .unwrap()
                .push((change.old.cloned(), change.new.clone()));
        });

        assert!(bag.set_value("count", 2));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.as_slice(), &[(Some(Value::Int(1)), Value::Int(2))]);
    }

    #[test]
    fn removed_observer_no_longer_fires() {
        let mut bag = PropertyBag::new();
        let id = bag.on_changing(|change| change.cancel = true);
        assert!(bag.remove_observer(id));
        assert!(!bag.remove_observer(id));

        assert!(bag.set_value("x", true));
    }

    #[test]
    fn typed_get_defaults_on_mismatch() {
        let mut bag = PropertyBag::new();
        bag.set_value("flag", "yes");
        assert!(!bag.get_value("flag", false));
        assert!(matches!(
            bag.try_get::<bool>("flag"),
            Err(DomainError::TypeMismatch { expected: "bool", actual: "text", .. })
        ));
        assert_eq!(bag.try_get::<bool>("missing"), Ok(None));
    }

    #[test]
    fn reserved_names_are_rejected() {
        let mut bag = PropertyBag::new();
        assert!(!bag.set_value("$id", "x"));
        assert!(bag.is_empty());
    }

    #[test]
    fn replace_all_resets_dirty() {
        let mut bag = PropertyBag::new();
        bag.set_value("a", 1);
        assert!(bag.is_dirty());

        let mut map = BTreeMap::new();
        map.insert("b".to_string(), Value::Int(2));
        bag.replace_all(map.clone());
        assert!(!bag.is_dirty());
        assert_eq!(bag.to_map(), map);
    }
}
