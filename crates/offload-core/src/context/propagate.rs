//! # Context isolation
//!
//! A background task must not inherit the caller's cancellation or deadline: the request
//! that submitted it may finish long before the task does. [`Isolator::isolate`] builds a
//! fresh [`Context`] and lets registered [`Propagate`] rules copy selected values across.
//!
//! ```text
//! caller ctx ──► rule #1 ──► rule #2 ──► ... ──► Carrier ──► new Context
//!   (read)       (set)       (set)                          (fresh token, no deadline)
//! ```
//!
//! Rules run in registration order; each receives the carrier returned by the previous one.
//! Rules only see the destination through [`Carrier::set`].

use std::sync::Arc;

use tracing::trace;

use super::{Context, Values};

/// Destination of a propagation rule: a write-only key-value set.
#[derive(Debug, Default)]
pub struct Carrier {
    values: Values,
}

impl Carrier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `key = value` in the destination context.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.values.push(key, value);
    }

    /// Builder-style [`set`](Self::set).
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        self.set(key, value);
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn into_context(self) -> Context {
        Context::from_values(self.values)
    }
}

/// Rule copying values from the caller's context into an isolated one.
///
/// Implementations must be pure: same source, same writes.
pub trait Propagate: Send + Sync + 'static {
    fn propagate(&self, from: &Context, to: Carrier) -> Carrier;
}

impl<F> Propagate for F
where
    F: Fn(&Context, Carrier) -> Carrier + Send + Sync + 'static,
{
    fn propagate(&self, from: &Context, to: Carrier) -> Carrier {
        (self)(from, to)
    }
}

/// Copies a fixed list of keys when they are present in the source.
#[derive(Debug, Clone)]
pub struct CopyKeys {
    keys: Vec<String>,
}

impl CopyKeys {
    pub fn new<I, K>(keys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Propagate for CopyKeys {
    fn propagate(&self, from: &Context, mut to: Carrier) -> Carrier {
        for key in &self.keys {
            if let Some(value) = from.get(key) {
                to.set(key.as_str(), value);
            }
        }
        to
    }
}

/// Ordered set of propagation rules.
#[derive(Clone, Default)]
pub struct Isolator {
    rules: Vec<Arc<dyn Propagate>>,
}

impl Isolator {
    #[inline]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    #[inline]
    pub fn register(&mut self, rule: Arc<dyn Propagate>) {
        self.rules.push(rule);
    }

    #[inline]
    pub fn with_rule(mut self, rule: impl Propagate) -> Self {
        self.register(Arc::new(rule));
        self
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Fresh context carrying only the values copied by the registered rules.
    pub fn isolate(&self, from: &Context) -> Context {
        let carrier = self
            .rules
            .iter()
            .fold(Carrier::new(), |to, rule| rule.propagate(from, to));
        trace!(
            rules = self.rules.len(),
            copied = carrier.len(),
            "context isolated"
        );
        carrier.into_context()
    }
}

impl std::fmt::Debug for Isolator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Isolator")
            .field("rules", &self.rules.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn caller() -> Context {
        Context::background()
            .with_value("someKey", "someValue")
            .with_value("someOtherKey", "someOtherValue")
    }

    #[test]
    fn no_rules_copies_nothing() {
        let isolated = Isolator::new().isolate(&caller());
        assert!(isolated.values().is_empty());
    }

    #[test]
    fn copy_keys_copies_only_named_values() {
        let isolator = Isolator::new().with_rule(CopyKeys::new(["someKey", "absent"]));
        let isolated = isolator.isolate(&caller());

        assert_eq!(isolated.get("someKey"), Some("someValue"));
        assert_eq!(isolated.get("someOtherKey"), None);
        assert_eq!(isolated.get("absent"), None);
    }

    #[test]
    fn rules_apply_in_registration_order() {
        let isolator = Isolator::new()
            .with_rule(|_: &Context, to: Carrier| to.with("stage", "first"))
            .with_rule(|_: &Context, to: Carrier| to.with("stage", "second"));

        let isolated = isolator.isolate(&caller());
        assert_eq!(isolated.get("stage"), Some("second"));
    }

    #[test]
    fn isolated_context_ignores_caller_cancellation_and_deadline() {
        let parent = caller().with_timeout(Duration::from_millis(1));
        let isolated = Isolator::new()
            .with_rule(CopyKeys::new(["someKey"]))
            .isolate(&parent);

        parent.cancel();

        assert!(parent.is_cancelled());
        assert!(!isolated.is_cancelled());
        assert!(isolated.deadline().is_none());
        assert_eq!(isolated.get("someKey"), Some("someValue"));
    }
}
