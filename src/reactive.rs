//! Minimal single-threaded reactivity primitives.
//!
//! - [`Observable`]: a value holder that notifies subscribers on every write
//! - [`Subscription`]: a subscriber registration, removed when dropped
//! - [`Scope`]: an owner of teardown hooks, run once in reverse order on
//!   [`Scope::dispose`] or when the scope is dropped
//!
//! # Example
//!
//! ```ignore
//! let container: Observable<Option<ElementRef>> = Observable::new(None);
//! let scope = Scope::new();
//!
//! let sub = container.subscribe(|el| println!("element present: {}", el.is_some()));
//! scope.adopt(sub);
//!
//! container.set(Some(element));
//! scope.dispose();
//! ```

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

type Callback<T> = Rc<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: RefCell<T>,
    subscribers: RefCell<Vec<(u64, Callback<T>)>>,
    next_id: Cell<u64>,
}

/// Value holder with change notification.
///
/// Clones share the same value and subscriber list.
pub struct Observable<T> {
    inner: Rc<ObservableInner<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observable")
            .field("value", &self.inner.value.borrow())
            .field("subscribers", &self.inner.subscribers.borrow().len())
            .finish()
    }
}

impl<T: Default + Clone + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + 'static> Observable<T> {
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(ObservableInner {
                value: RefCell::new(value),
                subscribers: RefCell::new(Vec::new()),
                next_id: Cell::new(0),
            }),
        }
    }

    /// Current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Store `value` and notify every subscriber, even when it is unchanged.
    ///
    /// Subscribers receive the written value and may read, write or
    /// (un)subscribe re-entrantly.
    pub fn set(&self, value: T) {
        *self.inner.value.borrow_mut() = value.clone();

        let subscribers: Vec<Callback<T>> = self
            .inner
            .subscribers
            .borrow()
            .iter()
            .map(|(_, cb)| Rc::clone(cb))
            .collect();

        for callback in subscribers {
            callback(&value);
        }
    }

    /// Register `callback` for future writes.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        self.inner
            .subscribers
            .borrow_mut()
            .push((id, Rc::new(callback)));

        let weak: Weak<ObservableInner<T>> = Rc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.subscribers.borrow_mut().retain(|(sid, _)| *sid != id);
                }
            })),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.borrow().len()
    }
}

/// Registration returned by [`Observable::subscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    /// Remove the subscriber now.
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// Owner of teardown hooks.
#[derive(Default)]
pub struct Scope {
    hooks: RefCell<Vec<Box<dyn FnOnce()>>>,
    disposed: Cell<bool>,
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scope")
            .field("hooks", &self.hooks.borrow().len())
            .field("disposed", &self.disposed.get())
            .finish()
    }
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` on dispose. A disposed scope runs it immediately.
    pub fn on_dispose(&self, hook: impl FnOnce() + 'static) {
        if self.disposed.get() {
            hook();
            return;
        }
        self.hooks.borrow_mut().push(Box::new(hook));
    }

    /// Keep `value` alive until the scope is disposed, then drop it.
    pub fn adopt<V: 'static>(&self, value: V) {
        self.on_dispose(move || drop(value));
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.get()
    }

    /// Run all hooks, most recently registered first. Later calls do nothing.
    pub fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }

        loop {
            // Hooks may register more hooks; pop one at a time
            let hook = self.hooks.borrow_mut().pop();
            match hook {
                Some(hook) => hook(),
                None => break,
            }
        }
    }
}

impl Drop for Scope {
    fn drop(&mut self) {
        self.dispose();
    }
}
