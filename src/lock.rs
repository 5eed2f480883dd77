//! [`Locker`] is the mutual-exclusion capability supplied to mutating
//! [`Bucket`](crate::Bucket) operations.

use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockWriteGuard};

/// [`Locker`] is an externally owned lock that serializes writers of a
/// [`Bucket`](crate::Bucket).
///
/// The lock is released when the returned guard is dropped, so every exit path of a mutating
/// operation releases it. The same lock instance must be supplied to every mutating call on a
/// bucket; the bucket does not own or create locks.
///
/// # Examples
///
/// ```
/// use cowbucket::Locker;
/// use std::sync::Mutex;
///
/// let lock = Mutex::new(());
/// {
///     let _guard = lock.acquire();
///     assert!(lock.try_lock().is_err());
/// }
/// assert!(lock.try_lock().is_ok());
/// ```
pub trait Locker {
    /// The guard that keeps the lock held while alive.
    type Guard<'l>
    where
        Self: 'l;

    /// Blocks until the lock is acquired.
    fn acquire(&self) -> Self::Guard<'_>;
}

/// The absent lock.
///
/// Passing it means that the caller guarantees external serialization of writers in another way.
///
/// # Examples
///
/// ```
/// use cowbucket::{Bucket, KeyValuePair, UNLOCKED};
///
/// let bucket: Bucket<KeyValuePair<u8>> = Bucket::new();
/// assert!(!bucket.delete("k", UNLOCKED));
/// ```
pub const UNLOCKED: Option<&Mutex<()>> = None;

impl<T: ?Sized> Locker for Mutex<T> {
    type Guard<'l> = MutexGuard<'l, T> where Self: 'l;

    #[inline]
    fn acquire(&self) -> Self::Guard<'_> {
        // A panicking writer never leaves a half-published chain behind.
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T: ?Sized> Locker for RwLock<T> {
    type Guard<'l> = RwLockWriteGuard<'l, T> where Self: 'l;

    #[inline]
    fn acquire(&self) -> Self::Guard<'_> {
        self.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(feature = "loom")]
impl<T> Locker for loom::sync::Mutex<T> {
    type Guard<'l> = loom::sync::MutexGuard<'l, T> where Self: 'l;

    #[inline]
    fn acquire(&self) -> Self::Guard<'_> {
        self.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Acquires `lock` if one was supplied.
#[inline]
pub(crate) fn acquire<L: Locker>(lock: Option<&L>) -> Option<L::Guard<'_>> {
    lock.map(|l| l.acquire())
}
