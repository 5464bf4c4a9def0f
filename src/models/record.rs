use serde::{de::DeserializeOwned, Serialize};

/// A value that can live in a [`Store`](crate::store::Store) collection.
///
/// Index values are plain strings so lookups behave the same for every
/// backend. A record may emit the same index name more than once to be
/// reachable under several values.
pub trait Record: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;

    fn key(&self) -> String;

    fn index_values(&self) -> Vec<(&'static str, String)> {
        Vec::new()
    }
}
