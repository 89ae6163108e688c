//! Shared handle to a cache owned by a session.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A named, clone-friendly handle to a cache instance.
///
/// This handle is:
/// - Single-threaded (`Rc` + `RefCell`; caches are only touched from the
///   simulation step)
/// - Clone-friendly (cloning is cheap, shares the same underlying cache)
///
/// Consumers receive handles at construction and keep them for the life of
/// the session. The session that created the cache decides when it goes
/// away; consumers never tear it down.
///
/// Borrows are released before `read`/`write` return. Calling back into the
/// same handle from inside the closure panics on the `RefCell`.
pub struct CacheHandle<C> {
    inner: Rc<RefCell<C>>,
    name: Rc<str>,
}

// Manual Clone implementation that doesn't require C: Clone
impl<C> Clone for CacheHandle<C> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            name: Rc::clone(&self.name),
        }
    }
}

impl<C> CacheHandle<C> {
    /// Wrap a freshly constructed cache.
    pub fn new(name: impl Into<Rc<str>>, cache: C) -> Self {
        Self {
            inner: Rc::new(RefCell::new(cache)),
            name: name.into(),
        }
    }

    /// Get the name of this cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Run `f` with shared access to the cache.
    pub fn read<R>(&self, f: impl FnOnce(&C) -> R) -> R {
        f(&self.inner.borrow())
    }

    /// Run `f` with exclusive access to the cache.
    pub fn write<R>(&self, f: impl FnOnce(&mut C) -> R) -> R {
        f(&mut self.inner.borrow_mut())
    }

    /// Whether two handles point at the same cache instance.
    pub fn same_cache(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<C: fmt::Debug> fmt::Debug for CacheHandle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("CacheHandle");
        debug.field("name", &self.name);
        match self.inner.try_borrow() {
            Ok(cache) => debug.field("cache", &*cache),
            Err(_) => debug.field("cache", &format_args!("<borrowed>")),
        };
        debug.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_state() {
        let handle = CacheHandle::new("numbers", Vec::<u32>::new());
        let other = handle.clone();

        other.write(|v| v.push(3));

        assert_eq!(handle.read(|v| v.len()), 1);
        assert!(handle.same_cache(&other));
        assert_eq!(other.name(), "numbers");
    }

    #[test]
    fn test_distinct_instances() {
        let a = CacheHandle::new("a", 0u8);
        let b = CacheHandle::new("a", 0u8);

        assert!(!a.same_cache(&b));
    }

    #[test]
    fn test_debug_while_writing() {
        let handle = CacheHandle::new("numbers", vec![1u32]);

        let inside = handle.write(|_| format!("{handle:?}"));

        assert!(inside.contains("<borrowed>"));
        assert!(format!("{handle:?}").contains("[1]"));
    }
}
