#![deny(missing_docs, clippy::all)]

//! Copy-on-write hash bucket for concurrent key-value maps.
//!
//! # cowbucket::Bucket
//! A single hash chain whose readers never lock. Writers are serialized by a lock owned by the
//! enclosing map, and publish every structural change with one atomic store of the chain head.
//!
//! # cowbucket::Pair
//! The node capability chained by a [`Bucket`], along with [`KeyValuePair`], a ready-made node
//! type.

mod tracing_helpers;

mod bucket;
pub use bucket::{Bucket, Iter};

mod error;
pub use error::Error;

mod lock;
pub use lock::{Locker, UNLOCKED};

mod pair;
pub use pair::{KeyValuePair, Pair};

#[cfg(feature = "serde")]
mod serde;
