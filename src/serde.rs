use serde::ser::{Serialize, SerializeMap, Serializer};
use sdd::Guard;

use std::fmt::Display;

use super::{Bucket, KeyValuePair, Pair};

/// Serializes a snapshot of the chain as a map, newest node first.
impl<V> Serialize for Bucket<KeyValuePair<V>>
where
    V: 'static + Display + Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        // The chain and its length are taken from the same head so that they agree.
        let guard = Guard::new();
        let iter = self.iter(&guard);
        let mut map = serializer.serialize_map(Some(iter.clone().count()))?;
        for pair in iter {
            pair.read(|element| map.serialize_entry(pair.key(), element))?;
        }
        map.end()
    }
}
