//! Shared-ownership handle for bound driver objects.
//!
//! [Handle<T>] owns a strong reference to an object using [std::sync::Arc]. Every child a
//! namespace node hands out is a [Handle]: the node keeps one clone in its cache and callers
//! receive further clones, so all of them refer to the same object.
//!
//! Key guarantees and semantics:
//! - Cloning a handle never clones the object; use [Handle::ptr_eq] to test identity.
//! - `T` may be unsized, so a handle can carry a driver trait object such as `Handle<dyn Ip>`.
use std::{fmt::Debug, ops::Deref, sync::Arc};

/// Strong owning handle backed by [Arc<T>].
pub struct Handle<T: ?Sized> {
    inner: Arc<T>,
}

impl<T: ?Sized> Handle<T> {
    /// Whether both handles refer to the same object.
    pub fn ptr_eq(&self, other: &Handle<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Borrow the underlying [Arc], e.g. to keep a clone outside the handle.
    pub fn as_arc(&self) -> &Arc<T> {
        &self.inner
    }
}

impl<T: ?Sized> Deref for Handle<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner
    }
}

impl<T: ?Sized> From<Arc<T>> for Handle<T> {
    fn from(inner: Arc<T>) -> Self {
        Self { inner }
    }
}

impl<T: ?Sized> Clone for Handle<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: ?Sized + Debug> Debug for Handle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.inner.fmt(f)
    }
}
