//! [`Pair`] is the node capability a [`Bucket`](crate::Bucket) chains together, and
//! [`KeyValuePair`] is a ready-made implementation of it.

use std::fmt::{self, Debug, Display};
use std::sync::atomic::Ordering::{AcqRel, Acquire, Release};

use sdd::{AtomicShared, Guard, Ptr, Shared, Tag};

/// [`Pair`] is a key-element node of a singly linked chain.
///
/// A published node never changes its key, and its forward link is written only once, before
/// the node becomes reachable; the element slot is the only part that may be updated afterwards.
pub trait Pair: 'static + Sized + Display {
    /// The handle to the element stored in the node.
    type Element;

    /// Returns the key.
    fn key(&self) -> &str;

    /// Returns the element.
    fn element(&self) -> Self::Element;

    /// Replaces the element.
    ///
    /// Readers holding the node concurrently must observe either the old or the new element.
    fn set_element(&self, element: Self::Element);

    /// Returns a reference to the forward link.
    fn link(&self) -> &AtomicShared<Self>;

    /// Returns a structurally independent copy of `self`.
    ///
    /// The copy has the same key and element, and its forward link is unset.
    #[must_use]
    fn copy(&self) -> Self;

    /// Returns a pointer to the next node.
    #[inline]
    fn next_ptr<'g>(&self, guard: &'g Guard) -> Ptr<'g, Self> {
        self.link().load(Acquire, guard)
    }

    /// Returns a strong reference to the next node.
    #[inline]
    fn next(&self) -> Option<Shared<Self>> {
        self.link().get_shared(Acquire, &Guard::new())
    }

    /// Sets the next node.
    ///
    /// This must only be called before `self` is published.
    #[inline]
    fn set_next(&self, next: Option<Shared<Self>>) {
        self.link().swap((next, Tag::None), Release);
    }
}

/// [`KeyValuePair`] owns a [`String`] key and an element of type `V`.
///
/// The element is kept in an atomically swappable slot; [`Pair::set_element`] replaces the
/// slot content as a whole so that readers never see a partially written element.
///
/// # Examples
///
/// ```
/// use cowbucket::{KeyValuePair, Pair};
/// use sdd::Shared;
///
/// let pair = KeyValuePair::new("apple", 3_u32);
/// assert_eq!(pair.key(), "apple");
/// assert_eq!(*pair.element(), 3);
///
/// pair.set_element(Shared::new(5));
/// assert_eq!(*pair.element(), 5);
/// assert_eq!(pair.to_string(), "apple=5");
/// ```
pub struct KeyValuePair<V: 'static> {
    key: String,
    element: AtomicShared<V>,
    next: AtomicShared<KeyValuePair<V>>,
}

impl<V: 'static> KeyValuePair<V> {
    /// Creates a new [`KeyValuePair`].
    #[inline]
    pub fn new<K: Into<String>>(key: K, element: V) -> Self {
        Self::with_element(key, Shared::new(element))
    }

    /// Creates a new [`KeyValuePair`] sharing an existing element.
    #[inline]
    pub fn with_element<K: Into<String>>(key: K, element: Shared<V>) -> Self {
        Self {
            key: key.into(),
            element: AtomicShared::from(element),
            next: AtomicShared::null(),
        }
    }

    /// Reads the element without taking a strong reference to it.
    ///
    /// # Examples
    ///
    /// ```
    /// use cowbucket::KeyValuePair;
    ///
    /// let pair = KeyValuePair::new("k", String::from("v"));
    /// assert_eq!(pair.read(String::len), 1);
    /// ```
    #[inline]
    pub fn read<R, F: FnOnce(&V) -> R>(&self, reader: F) -> R {
        let guard = Guard::new();
        match self.element.load(Acquire, &guard).as_ref() {
            Some(element) => reader(element),
            None => unreachable!(),
        }
    }

    fn load_element(&self) -> Shared<V> {
        // The slot is filled on construction and only ever swapped for another element.
        match self.element.get_shared(Acquire, &Guard::new()) {
            Some(element) => element,
            None => unreachable!(),
        }
    }
}

impl<V: 'static + Display> Pair for KeyValuePair<V> {
    type Element = Shared<V>;

    #[inline]
    fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    fn element(&self) -> Shared<V> {
        self.load_element()
    }

    #[inline]
    fn set_element(&self, element: Shared<V>) {
        self.element.swap((Some(element), Tag::None), AcqRel);
    }

    #[inline]
    fn link(&self) -> &AtomicShared<Self> {
        &self.next
    }

    #[inline]
    fn copy(&self) -> Self {
        Self::with_element(self.key.clone(), self.load_element())
    }
}

impl<V: 'static + Debug> Debug for KeyValuePair<V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let element = self.load_element();
        f.debug_struct("KeyValuePair")
            .field("key", &self.key)
            .field("element", &*element)
            .finish_non_exhaustive()
    }
}

impl<V: 'static + Display> Display for KeyValuePair<V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.read(|element| write!(f, "{}={element}", self.key))
    }
}
