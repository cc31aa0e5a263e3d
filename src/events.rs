//! Event emitter and observable field primitives
//!
//! The router needs two small reactive building blocks:
//!
//! - [`Emitter`] - an ordered listener list with subscribe/unsubscribe. Listeners
//!   run synchronously in subscription order and receive the event mutably,
//!   which is what lets interception listeners abort or redirect a change.
//!   Dropping the emitter drops every listener with it.
//! - [`ObservableField`] - a value with change notification, used for route
//!   parameters so in-place updates can be observed without replacing the route.

use std::fmt;

/// Handle returned by `subscribe`; pass it back to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener<E> = Box<dyn FnMut(&mut E)>;

/// Ordered, synchronous listener list.
pub struct Emitter<E> {
    next_id: u64,
    listeners: Vec<(SubscriptionId, Listener<E>)>,
}

impl<E> Emitter<E> {
    /// Create an emitter with no listeners.
    pub fn new() -> Self {
        Self {
            next_id: 0,
            listeners: Vec::new(),
        }
    }

    /// Add a listener. It runs after every listener subscribed before it.
    pub fn subscribe<F>(&mut self, listener: F) -> SubscriptionId
    where
        F: FnMut(&mut E) + 'static,
    {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener. Returns `false` if it was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(existing, _)| *existing != id);
        self.listeners.len() != before
    }

    /// Deliver `event` to every listener in subscription order.
    pub fn emit(&mut self, event: &mut E) {
        for (_, listener) in &mut self.listeners {
            listener(event);
        }
    }

    /// Remove every listener.
    pub fn clear(&mut self) {
        self.listeners.clear();
    }

    /// Number of subscribed listeners.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is subscribed.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl<E> Default for Emitter<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> fmt::Debug for Emitter<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Emitter")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

/// A value that notifies watchers when it changes.
///
/// # Example
///
/// ```
/// use history_router::ObservableField;
/// use std::cell::RefCell;
/// use std::rc::Rc;
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let mut field = ObservableField::new(1);
/// let sink = Rc::clone(&seen);
/// field.watch(move |value| sink.borrow_mut().push(*value));
///
/// assert!(field.set(2));
/// assert!(!field.set(2));
/// assert_eq!(*seen.borrow(), vec![2]);
/// ```
pub struct ObservableField<T> {
    value: T,
    watchers: Emitter<T>,
}

impl<T: Clone + PartialEq> ObservableField<T> {
    /// Create a field holding `value`.
    pub fn new(value: T) -> Self {
        Self {
            value,
            watchers: Emitter::new(),
        }
    }

    /// Current value.
    pub fn get(&self) -> &T {
        &self.value
    }

    /// Store `value`, notifying watchers if it differs from the current one.
    /// Returns whether the value changed.
    pub fn set(&mut self, value: T) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        let mut notified = self.value.clone();
        self.watchers.emit(&mut notified);
        true
    }

    /// Watch for changes. The watcher receives the new value.
    pub fn watch<F>(&mut self, mut watcher: F) -> SubscriptionId
    where
        F: FnMut(&T) + 'static,
    {
        self.watchers.subscribe(move |value: &mut T| watcher(value))
    }

    /// Stop watching.
    pub fn unwatch(&mut self, id: SubscriptionId) -> bool {
        self.watchers.unsubscribe(id)
    }

    /// Drop every watcher.
    pub fn clear_watchers(&mut self) {
        self.watchers.clear();
    }
}

impl<T: fmt::Debug> fmt::Debug for ObservableField<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObservableField")
            .field("value", &self.value)
            .field("watchers", &self.watchers.len())
            .finish()
    }
}
