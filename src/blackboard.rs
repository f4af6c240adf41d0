use crate::Symbol;
use serde::{Deserialize, Serialize};
use std::{
    cell::RefCell,
    collections::{HashMap, HashSet},
    fmt::{self, Display, Formatter},
};
use tracing::{trace, warn};

/// A value stored in the [`Blackboard`].
///
/// Any key may hold any kind of value, but reads go through typed accessors, so a
/// condition expecting a number never silently compares against a boolean.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlackboardValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Number,
    Text,
}

impl BlackboardValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::Text(_) => ValueKind::Text,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        if let Self::Number(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        if let Self::Bool(v) = self {
            Some(*v)
        } else {
            None
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        if let Self::Text(v) = self {
            Some(v)
        } else {
            None
        }
    }

    /// Interprets a literal from a tree source or a config file: `true` and
    /// `false` become booleans, anything parseable as a float becomes a number,
    /// the rest is text.
    pub fn parse_literal(s: &str) -> Self {
        match s {
            "true" => Self::Bool(true),
            "false" => Self::Bool(false),
            _ => s
                .parse::<f64>()
                .map(Self::Number)
                .unwrap_or_else(|_| Self::Text(s.to_owned())),
        }
    }
}

impl Display for BlackboardValue {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        match self {
            Self::Bool(v) => v.fmt(fmt),
            Self::Number(v) => v.fmt(fmt),
            Self::Text(v) => write!(fmt, "{:?}", v),
        }
    }
}

impl From<bool> for BlackboardValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<f64> for BlackboardValue {
    fn from(v: f64) -> Self {
        Self::Number(v)
    }
}

impl From<f32> for BlackboardValue {
    fn from(v: f32) -> Self {
        Self::Number(v.into())
    }
}

impl From<i32> for BlackboardValue {
    fn from(v: i32) -> Self {
        Self::Number(v.into())
    }
}

impl From<&str> for BlackboardValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_owned())
    }
}

impl From<String> for BlackboardValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

/// What an observer is told about a write.
#[derive(Debug)]
pub struct BlackboardChange<'a> {
    pub key: Symbol,
    pub old: Option<&'a BlackboardValue>,
    pub new: Option<&'a BlackboardValue>,
}

pub type Observer = Box<dyn FnMut(&BlackboardChange)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObserverId(u64);

/// Blackboard is a mapping of variable names to their values, with change
/// notification.
///
/// Observers are invoked synchronously inside [`Blackboard::set`], in the order
/// they subscribed, and only when the stored value actually changed.
/// They cannot reach back into the blackboard, so a notification never re-enters
/// a write in progress.
#[derive(Default)]
pub struct Blackboard {
    values: HashMap<Symbol, BlackboardValue>,
    observers: Vec<(ObserverId, Symbol, Observer)>,
    next_observer: u64,
    /// Keys already reported as missing, so each is warned about once.
    warned: RefCell<HashSet<Symbol>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: impl Into<Symbol>) -> Option<&BlackboardValue> {
        self.values.get(&key.into())
    }

    pub fn contains(&self, key: impl Into<Symbol>) -> bool {
        self.values.contains_key(&key.into())
    }

    /// Reads a number, falling back to `0.0` when the key is unset or holds
    /// another kind of value.
    pub fn get_number(&self, key: impl Into<Symbol>) -> f64 {
        let key = key.into();
        self.get(key)
            .and_then(BlackboardValue::as_number)
            .unwrap_or_else(|| {
                self.note_missing(key, ValueKind::Number);
                0.
            })
    }

    /// Reads a boolean, falling back to `false`.
    pub fn get_bool(&self, key: impl Into<Symbol>) -> bool {
        let key = key.into();
        self.get(key).and_then(BlackboardValue::as_bool).unwrap_or_else(|| {
            self.note_missing(key, ValueKind::Bool);
            false
        })
    }

    pub fn get_text(&self, key: impl Into<Symbol>) -> Option<&str> {
        self.get(key).and_then(BlackboardValue::as_text)
    }

    /// Stores `value` at `key` and notifies the observers of `key` if it changed.
    /// Returns whether the stored value changed.
    pub fn set(&mut self, key: impl Into<Symbol>, value: impl Into<BlackboardValue>) -> bool {
        let key = key.into();
        let value = value.into();
        if self.values.get(&key) == Some(&value) {
            return false;
        }
        trace!(%key, %value, "blackboard write");
        let old = self.values.insert(key, value);
        let change = BlackboardChange {
            key,
            old: old.as_ref(),
            new: self.values.get(&key),
        };
        for (_, _, observer) in self.observers.iter_mut().filter(|(_, k, _)| *k == key) {
            observer(&change);
        }
        true
    }

    /// Removes `key`, notifying its observers if it was set.
    pub fn remove(&mut self, key: impl Into<Symbol>) -> Option<BlackboardValue> {
        let key = key.into();
        let old = self.values.remove(&key)?;
        let change = BlackboardChange {
            key,
            old: Some(&old),
            new: None,
        };
        for (_, _, observer) in self.observers.iter_mut().filter(|(_, k, _)| *k == key) {
            observer(&change);
        }
        Some(old)
    }

    pub fn subscribe(
        &mut self,
        key: impl Into<Symbol>,
        observer: impl FnMut(&BlackboardChange) + 'static,
    ) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, key.into(), Box::new(observer)));
        id
    }

    /// Removes an observer. Unsubscribing twice is harmless; the return value
    /// tells whether anything was removed.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(observer, _, _)| *observer != id);
        before != self.observers.len()
    }

    pub fn num_observers(&self) -> usize {
        self.observers.len()
    }

    pub fn keys(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.values.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Forgets every value and observer. Observers are dropped without being
    /// notified.
    pub fn clear(&mut self) {
        self.values.clear();
        self.observers.clear();
        self.warned.get_mut().clear();
    }

    pub(crate) fn note_missing(&self, key: Symbol, expected: ValueKind) {
        if self.warned.borrow_mut().insert(key) {
            match self.values.get(&key) {
                None => warn!(%key, ?expected, "blackboard key was never written, using default"),
                Some(value) => warn!(
                    %key,
                    ?expected,
                    found = ?value.kind(),
                    "blackboard value has the wrong kind, using default"
                ),
            }
        }
    }
}

impl fmt::Debug for Blackboard {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        let mut entries: Vec<_> = self.values.iter().collect();
        entries.sort_by_key(|(key, _)| **key);
        fmt.debug_struct("Blackboard")
            .field("values", &entries)
            .field("observers", &self.observers.len())
            .finish()
    }
}

#[cfg(test)]
mod test;
