//! [`Bucket`] is a copy-on-write chain of [`Pair`] nodes with lock-free readers.

use std::fmt::{self, Debug, Display};
use std::iter::FusedIterator;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

use sdd::{AtomicShared, Guard, Ptr, Shared, Tag};

use crate::error::Error;
use crate::lock::{acquire, Locker};
use crate::pair::Pair;
use crate::tracing_helpers::{debug_log, trace_log};

/// [`Bucket`] is a single hash chain of a concurrent key-value map.
///
/// Readers traverse the chain without locking. Writers are serialized by a [`Locker`] supplied
/// by the owner of the bucket, and never rewrite the forward link of a reachable node: an
/// insertion prepends a new node, and a deletion rebuilds the nodes in front of the deleted one
/// as copies before publishing the new chain with a single atomic store. A reader that loaded
/// the head before a deletion thus keeps seeing the old chain in full.
///
/// Unreachable nodes are reclaimed by [`sdd`] once no reader holds them.
pub struct Bucket<P> {
    /// `head` points to the newest node, or is null if the bucket is empty.
    head: AtomicShared<P>,
    /// The number of nodes reachable from `head`.
    len: AtomicU64,
}

/// An iterator over the nodes of a [`Bucket`].
///
/// [`Iter`] walks the chain that was published when it was created; it reads the newest node
/// first.
pub struct Iter<'g, P> {
    current: Ptr<'g, P>,
    guard: &'g Guard,
}

impl<P: Pair> Bucket<P> {
    /// Creates an empty [`Bucket`].
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair};
    ///
    /// let bucket: Bucket<KeyValuePair<usize>> = Bucket::new();
    /// assert_eq!(bucket.size(), 0);
    /// ```
    #[cfg(not(feature = "loom"))]
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            head: AtomicShared::null(),
            len: AtomicU64::new(0),
        }
    }

    /// Creates an empty [`Bucket`].
    #[cfg(feature = "loom")]
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            head: AtomicShared::null(),
            len: AtomicU64::new(0),
        }
    }

    /// Puts a node into the [`Bucket`].
    ///
    /// If a node with the same key exists, its element is replaced with that of `pair` and
    /// `false` is returned; the existing node stays in place. Otherwise `pair` becomes the new
    /// head of the chain and `true` is returned.
    ///
    /// `lock`, if supplied, is held until the method returns.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `pair` is `None`.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, Pair};
    /// use sdd::Shared;
    /// use std::sync::Mutex;
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// let lock = Mutex::new(());
    ///
    /// assert_eq!(bucket.put(Some(Shared::new(KeyValuePair::new("a", 1))), Some(&lock)), Ok(true));
    /// assert_eq!(bucket.put(Some(Shared::new(KeyValuePair::new("a", 2))), Some(&lock)), Ok(false));
    /// assert!(bucket.put(None, Some(&lock)).is_err());
    ///
    /// assert_eq!(*bucket.get("a").unwrap().element(), 2);
    /// assert_eq!(bucket.size(), 1);
    /// ```
    pub fn put<L: Locker>(&self, pair: Option<Shared<P>>, lock: Option<&L>) -> Result<bool, Error> {
        let Some(pair) = pair else {
            debug_log!("Bucket::put: rejected a nil pair");
            return Err(Error::InvalidArgument("pair is nil"));
        };
        let _locked = acquire(lock);

        let guard = Guard::new();
        let head_ptr = self.head.load(Acquire, &guard);
        if head_ptr.is_null() {
            self.publish(Some(pair));
            self.len.fetch_add(1, AcqRel);
            trace_log!("Bucket::put: published the first node");
            return Ok(true);
        }

        if let Some(target) = Iter::new(head_ptr, &guard).find(|p| p.key() == pair.key()) {
            target.set_element(pair.element());
            trace_log!(key = pair.key(), "Bucket::put: updated in place");
            return Ok(false);
        }

        pair.set_next(head_ptr.get_shared());
        self.publish(Some(pair));
        self.len.fetch_add(1, AcqRel);
        trace_log!(len = self.len.load(Acquire), "Bucket::put: published a new head");
        Ok(true)
    }

    /// Returns a strong reference to the node associated with the key.
    ///
    /// Returns `None` if no node has the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, Pair, UNLOCKED};
    /// use sdd::Shared;
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// assert!(bucket.get("a").is_none());
    ///
    /// bucket.put(Some(Shared::new(KeyValuePair::new("a", 7))), UNLOCKED).unwrap();
    /// assert_eq!(bucket.get("a").map(|p| *p.element()), Some(7));
    /// ```
    #[inline]
    pub fn get(&self, key: &str) -> Option<Shared<P>> {
        let guard = Guard::new();
        loop {
            let found = self.find(key, &guard);
            if found.is_null() {
                return None;
            }
            // The node may have been unlinked and released after it was found; the node or its
            // copy is then reachable from a more recent head.
            if let Some(pair) = found.get_shared() {
                return Some(pair);
            }
        }
    }

    /// Returns a guarded reference to the node associated with the key.
    ///
    /// The returned reference can survive as long as the associated [`Guard`] is alive.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, Pair, UNLOCKED};
    /// use sdd::{Guard, Shared};
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// bucket.put(Some(Shared::new(KeyValuePair::new("a", 7))), UNLOCKED).unwrap();
    ///
    /// let guard = Guard::new();
    /// assert_eq!(bucket.peek("a", &guard).map(Pair::key), Some("a"));
    /// assert!(bucket.peek("b", &guard).is_none());
    /// ```
    #[inline]
    pub fn peek<'g>(&self, key: &str, guard: &'g Guard) -> Option<&'g P> {
        self.find(key, guard).as_ref()
    }

    /// Reads the node associated with the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, UNLOCKED};
    /// use sdd::Shared;
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// bucket.put(Some(Shared::new(KeyValuePair::new("a", 7))), UNLOCKED).unwrap();
    ///
    /// assert_eq!(bucket.peek_with("a", |p| p.read(|v| *v)), Some(7));
    /// assert!(bucket.peek_with("b", |_| ()).is_none());
    /// ```
    #[inline]
    pub fn peek_with<R, F: FnOnce(&P) -> R>(&self, key: &str, reader: F) -> Option<R> {
        let guard = Guard::new();
        self.find(key, &guard).as_ref().map(reader)
    }

    /// Returns a strong reference to the newest node.
    ///
    /// Returns `None` if the [`Bucket`] is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, Pair, UNLOCKED};
    /// use sdd::Shared;
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// assert!(bucket.get_first().is_none());
    ///
    /// bucket.put(Some(Shared::new(KeyValuePair::new("a", 1))), UNLOCKED).unwrap();
    /// bucket.put(Some(Shared::new(KeyValuePair::new("b", 2))), UNLOCKED).unwrap();
    /// assert_eq!(bucket.get_first().unwrap().key(), "b");
    /// ```
    #[inline]
    pub fn get_first(&self) -> Option<Shared<P>> {
        self.head.get_shared(Acquire, &Guard::new())
    }

    /// Deletes the node associated with the key.
    ///
    /// Returns `false` if no node has the key.
    ///
    /// The nodes in front of the deleted one are replaced with fresh copies linked to the
    /// unchanged remainder of the chain, and the new chain is published at once. `lock`, if
    /// supplied, is held until the method returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, UNLOCKED};
    /// use sdd::Shared;
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// assert!(!bucket.delete("a", UNLOCKED));
    ///
    /// bucket.put(Some(Shared::new(KeyValuePair::new("a", 1))), UNLOCKED).unwrap();
    /// assert!(bucket.delete("a", UNLOCKED));
    /// assert!(bucket.is_empty());
    /// ```
    pub fn delete<L: Locker>(&self, key: &str, lock: Option<&L>) -> bool {
        let _locked = acquire(lock);

        let guard = Guard::new();
        let mut prefix: Vec<&P> = Vec::new();
        let mut current = self.head.load(Acquire, &guard);
        let tail = loop {
            let Some(pair) = current.as_ref() else {
                return false;
            };
            if pair.key() == key {
                break pair.next();
            }
            prefix.push(pair);
            current = pair.next_ptr(&guard);
        };

        trace_log!(key, copied = prefix.len(), "Bucket::delete: rebuilding the prefix");
        let new_head = prefix.into_iter().rev().fold(tail, |next, pair| {
            let copied = Shared::new(pair.copy());
            copied.set_next(next);
            Some(copied)
        });
        self.publish(new_head);
        self.len.fetch_sub(1, AcqRel);
        true
    }

    /// Clears the [`Bucket`].
    ///
    /// Detached nodes are reclaimed once no reader holds them. `lock`, if supplied, is held until
    /// the method returns.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, UNLOCKED};
    /// use sdd::Shared;
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// bucket.put(Some(Shared::new(KeyValuePair::new("a", 1))), UNLOCKED).unwrap();
    ///
    /// bucket.clear(UNLOCKED);
    /// assert_eq!(bucket.size(), 0);
    /// assert!(bucket.get_first().is_none());
    /// ```
    #[inline]
    pub fn clear<L: Locker>(&self, lock: Option<&L>) {
        let _locked = acquire(lock);
        self.len.store(0, Release);
        self.publish(None);
        trace_log!("Bucket::clear: published an empty chain");
    }

    /// Returns the number of nodes in the [`Bucket`].
    ///
    /// The value may lag behind a concurrent writer.
    #[inline]
    pub fn size(&self) -> u64 {
        self.len.load(Acquire)
    }

    /// Returns `true` if the [`Bucket`] is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair};
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::default();
    /// assert!(bucket.is_empty());
    /// ```
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_null(Acquire)
    }

    /// Returns an [`Iter`] over the chain published at the moment of the call.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::{Bucket, KeyValuePair, Pair, UNLOCKED};
    /// use sdd::{Guard, Shared};
    ///
    /// let bucket: Bucket<KeyValuePair<u32>> = Bucket::new();
    /// for (k, v) in [("a", 1), ("b", 2), ("c", 3)] {
    ///     bucket.put(Some(Shared::new(KeyValuePair::new(k, v))), UNLOCKED).unwrap();
    /// }
    ///
    /// let guard = Guard::new();
    /// let keys: Vec<&str> = bucket.iter(&guard).map(Pair::key).collect();
    /// assert_eq!(keys, ["c", "b", "a"]);
    /// ```
    #[inline]
    pub fn iter<'g>(&self, guard: &'g Guard) -> Iter<'g, P> {
        Iter::new(self.head.load(Acquire, guard), guard)
    }

    /// Finds the node associated with the key in the current chain.
    fn find<'g>(&self, key: &str, guard: &'g Guard) -> Ptr<'g, P> {
        let mut current = self.head.load(Acquire, guard);
        while let Some(pair) = current.as_ref() {
            if pair.key() == key {
                break;
            }
            current = pair.next_ptr(guard);
        }
        current
    }

    /// Makes `new_head` visible to readers.
    fn publish(&self, new_head: Option<Shared<P>>) {
        // The previous chain is released here, and reclaimed once readers are done with it.
        self.head.swap((new_head, Tag::None), AcqRel);
    }
}

impl<P: Pair + Debug> Debug for Bucket<P> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = Guard::new();
        f.debug_set().entries(self.iter(&guard)).finish()
    }
}

impl<P: Pair> Default for Bucket<P> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Pair> Display for Bucket<P> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let guard = Guard::new();
        f.write_str("[ ")?;
        for pair in self.iter(&guard) {
            write!(f, "{pair} ")?;
        }
        f.write_str("]")
    }
}

impl<'g, P: Pair> Iter<'g, P> {
    fn new(current: Ptr<'g, P>, guard: &'g Guard) -> Self {
        Self { current, guard }
    }
}

impl<P> Clone for Iter<'_, P> {
    #[inline]
    fn clone(&self) -> Self {
        Self {
            current: self.current,
            guard: self.guard,
        }
    }
}

impl<P: Pair> FusedIterator for Iter<'_, P> {}

impl<'g, P: Pair> Iterator for Iter<'g, P> {
    type Item = &'g P;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(current) = self.current.as_ref() {
            self.current = current.next_ptr(self.guard);
            Some(current)
        } else {
            None
        }
    }
}
