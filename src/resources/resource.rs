//! Reference-Counted Resources
//!
//! GPU buffers are shared between passes: a geometry pass writes a G-Buffer
//! that several effect passes sample, and an intermediate target is both the
//! output of one pass and the input of the next. Releasing such a buffer must
//! happen exactly once, when the last slot stops referring to it.
//!
//! # Design
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │ ResourceRegistry<T>   (Rc<RefCell<..>>)      │
//! │                                              │
//! │  SlotMap<ResourceKey, Entry { value, refs }> │
//! └──────────────────────────────────────────────┘
//!        ▲ retain / release          ▲
//!        │                           │
//!  Resource<T> (input slot)    Resource<T> (output slot)
//! ```
//!
//! - [`ResourceRegistry::insert`] stores a value with a count of zero.
//! - [`Resource::set`] retains the new key *before* releasing the old one,
//!   so re-assigning the same value never disposes it.
//! - When a count reaches zero the value is removed from the registry and
//!   [`Disposable::dispose`] runs immediately.
//! - [`Resource::dispose`] (and `Drop`) is `set(None)`.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

new_key_type! {
    /// Identity of a value stored in a [`ResourceRegistry`].
    pub struct ResourceKey;
}

/// A value whose underlying (GPU) memory must be released explicitly.
pub trait Disposable {
    fn dispose(&mut self);
}

struct Entry<T> {
    value: T,
    ref_count: usize,
}

/// Identity-keyed table of reference-counted values.
pub struct ResourceRegistry<T: Disposable> {
    entries: SlotMap<ResourceKey, Entry<T>>,
    disposed: usize,
}

/// Shared handle to a registry. The crate is single-threaded.
pub type SharedRegistry<T> = Rc<RefCell<ResourceRegistry<T>>>;

impl<T: Disposable> Default for ResourceRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Disposable> ResourceRegistry<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: SlotMap::with_key(),
            disposed: 0,
        }
    }

    #[must_use]
    pub fn shared() -> SharedRegistry<T> {
        Rc::new(RefCell::new(Self::new()))
    }

    /// Stores `value` unreferenced. It lives until a [`Resource`] takes it
    /// and later releases it, or until [`purge_unreferenced`](Self::purge_unreferenced).
    pub fn insert(&mut self, value: T) -> ResourceKey {
        self.entries.insert(Entry {
            value,
            ref_count: 0,
        })
    }

    #[must_use]
    pub fn get(&self, key: ResourceKey) -> Option<&T> {
        self.entries.get(key).map(|e| &e.value)
    }

    pub fn get_mut(&mut self, key: ResourceKey) -> Option<&mut T> {
        self.entries.get_mut(key).map(|e| &mut e.value)
    }

    #[must_use]
    pub fn contains(&self, key: ResourceKey) -> bool {
        self.entries.contains_key(key)
    }

    #[must_use]
    pub fn ref_count(&self, key: ResourceKey) -> usize {
        self.entries.get(key).map_or(0, |e| e.ref_count)
    }

    /// Number of live values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of values disposed by this registry so far.
    #[must_use]
    pub fn disposed_count(&self) -> usize {
        self.disposed
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut T> + '_ {
        self.entries.values_mut().map(|e| &mut e.value)
    }

    fn retain(&mut self, key: ResourceKey) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.ref_count += 1;
                true
            }
            None => false,
        }
    }

    fn release(&mut self, key: ResourceKey) {
        let Some(entry) = self.entries.get_mut(key) else {
            return;
        };

        entry.ref_count = entry.ref_count.saturating_sub(1);
        if entry.ref_count == 0 {
            self.dispose_entry(key);
        }
    }

    fn dispose_entry(&mut self, key: ResourceKey) {
        if let Some(mut entry) = self.entries.remove(key) {
            entry.value.dispose();
            self.disposed += 1;
            log::debug!("Disposed resource {key:?}");
        }
    }

    /// Disposes every value that no [`Resource`] currently references.
    pub fn purge_unreferenced(&mut self) -> usize {
        let orphans: Vec<ResourceKey> = self
            .entries
            .iter()
            .filter(|(_, e)| e.ref_count == 0)
            .map(|(k, _)| k)
            .collect();

        for &key in &orphans {
            self.dispose_entry(key);
        }
        orphans.len()
    }
}

/// A reference-counted slot pointing at a value in a [`ResourceRegistry`].
pub struct Resource<T: Disposable> {
    registry: SharedRegistry<T>,
    key: Option<ResourceKey>,
}

impl<T: Disposable> Resource<T> {
    /// Creates an empty slot.
    #[must_use]
    pub fn new(registry: &SharedRegistry<T>) -> Self {
        Self {
            registry: Rc::clone(registry),
            key: None,
        }
    }

    /// Creates a slot that already references `key`.
    #[must_use]
    pub fn with_value(registry: &SharedRegistry<T>, key: ResourceKey) -> Self {
        let mut resource = Self::new(registry);
        resource.set(Some(key));
        resource
    }

    #[inline]
    #[must_use]
    pub fn value(&self) -> Option<ResourceKey> {
        self.key
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.key.is_none()
    }

    #[must_use]
    pub fn registry(&self) -> &SharedRegistry<T> {
        &self.registry
    }

    /// Points the slot at `key`, releasing the previous value.
    ///
    /// A key that no longer exists in the registry leaves the slot empty.
    pub fn set(&mut self, key: Option<ResourceKey>) {
        if self.key == key {
            return;
        }

        let mut registry = self.registry.borrow_mut();
        let next = key.filter(|&k| registry.retain(k));
        if let Some(old) = self.key.take() {
            registry.release(old);
        }
        self.key = next;
    }

    /// Copies the value of `other` into this slot.
    pub fn set_from(&mut self, other: &Resource<T>) {
        self.set(other.key);
    }

    /// Releases the referenced value.
    pub fn dispose(&mut self) {
        self.set(None);
    }
}

impl<T: Disposable> Clone for Resource<T> {
    fn clone(&self) -> Self {
        let mut clone = Self::new(&self.registry);
        clone.set(self.key);
        clone
    }
}

impl<T: Disposable> Drop for Resource<T> {
    fn drop(&mut self) {
        if let Some(key) = self.key.take()
            && let Ok(mut registry) = self.registry.try_borrow_mut()
        {
            registry.release(key);
        }
    }
}

impl<T: Disposable> PartialEq for Resource<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.registry, &other.registry) && self.key == other.key
    }
}

impl<T: Disposable> fmt::Debug for Resource<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resource").field("key", &self.key).finish()
    }
}
