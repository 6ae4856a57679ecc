//! Lazily populated wrappers around refine.bio records.
//!
//! An [`Entity`] starts from whatever fields the server (or the caller)
//! supplied. The first read of a blank field on an instance that has an
//! identifier fetches the full record once and swaps it in whole.

use std::fmt;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize, Serializer};

use crate::client::Api;
use crate::error::RefineError;
use crate::pagination::{Filters, PaginatedList};

/// A record type served from `ENDPOINT/<key>/`.
pub trait Resource:
    Clone + Default + PartialEq + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    const NAME: &'static str;
    const ENDPOINT: &'static str;
    const SEARCH_ENDPOINT: &'static str = Self::ENDPOINT;

    type Key: Clone
        + fmt::Debug
        + fmt::Display
        + PartialEq
        + Serialize
        + DeserializeOwned
        + Send
        + Sync;

    fn key(&self) -> Option<Self::Key>;

    /// A record with only its identifier set.
    fn keyed(key: Self::Key) -> Self;

    /// Hook for records whose identifier is part of the URL but not of the
    /// response body.
    fn restore_key(self, _key: &Self::Key) -> Self {
        self
    }
}

/// Nested values the API returns either as a bare identifier or as a full
/// object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    untagged,
    bound(serialize = "R: Resource", deserialize = "R: Resource")
)]
pub enum Reference<R: Resource> {
    Key(R::Key),
    Record(R),
}

impl<R: Resource> Reference<R> {
    pub fn into_record(self) -> R {
        match self {
            Reference::Key(key) => R::keyed(key),
            Reference::Record(record) => record,
        }
    }
}

/// A nested record given either as a numeric database id or in full. Used
/// where the id is not the record's own lookup key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Linked<R> {
    Id(i64),
    Record(R),
}

impl<R> Linked<R> {
    pub fn id(&self) -> Option<i64> {
        match self {
            Linked::Id(id) => Some(*id),
            Linked::Record(_) => None,
        }
    }

    pub fn record(&self) -> Option<&R> {
        match self {
            Linked::Id(_) => None,
            Linked::Record(record) => Some(record),
        }
    }
}

/// Deserializes `null` as the type's default, for list fields the API
/// sometimes sends as `null`.
pub fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Values that count as "not populated yet".
pub trait Blank {
    fn is_blank(&self) -> bool;
}

impl<T> Blank for Option<T> {
    fn is_blank(&self) -> bool {
        self.is_none()
    }
}

impl<T> Blank for Vec<T> {
    fn is_blank(&self) -> bool {
        self.is_empty()
    }
}

#[derive(Debug, Clone)]
enum LoadState<R> {
    Unfetched(Arc<R>),
    Fetched(Arc<R>),
}

impl<R> LoadState<R> {
    fn record(&self) -> &Arc<R> {
        match self {
            LoadState::Unfetched(record) | LoadState::Fetched(record) => record,
        }
    }

    fn is_fetched(&self) -> bool {
        matches!(self, LoadState::Fetched(_))
    }
}

#[derive(Debug, Clone)]
struct Slot<R> {
    state: LoadState<R>,
    local_path: Option<PathBuf>,
}

pub struct Entity<R: Resource> {
    api: Api,
    slot: Mutex<Slot<R>>,
}

impl<R: Resource> Entity<R> {
    pub fn from_record(api: &Api, record: R) -> Self {
        Self::with_state(api, LoadState::Unfetched(Arc::new(record)))
    }

    /// An unfetched entity knowing only its identifier.
    pub fn reference(api: &Api, key: impl Into<R::Key>) -> Self {
        Self::from_record(api, R::keyed(key.into()))
    }

    pub fn from_reference(api: &Api, reference: Reference<R>) -> Self {
        Self::from_record(api, reference.into_record())
    }

    fn with_state(api: &Api, state: LoadState<R>) -> Self {
        Self {
            api: api.clone(),
            slot: Mutex::new(Slot {
                state,
                local_path: None,
            }),
        }
    }

    pub fn get(api: &Api, key: impl Into<R::Key>) -> Result<Self, RefineError> {
        let record = Self::fetch(api, &key.into())?;
        Ok(Self::with_state(api, LoadState::Fetched(Arc::new(record))))
    }

    pub fn search(api: &Api, filters: &Filters) -> Result<PaginatedList<R>, RefineError> {
        PaginatedList::fetch(api, api.endpoint_url(R::SEARCH_ENDPOINT), filters.clone())
    }

    fn fetch(api: &Api, key: &R::Key) -> Result<R, RefineError> {
        tracing::debug!(resource = R::NAME, key = %key, "fetching record");
        let record: R = api.get(&format!("{}/{}", R::ENDPOINT, key), &[])?;
        Ok(record.restore_key(key))
    }

    pub fn api(&self) -> &Api {
        &self.api
    }

    /// Current record without triggering a fetch.
    pub fn record(&self) -> Arc<R> {
        self.lock().state.record().clone()
    }

    pub fn key(&self) -> Option<R::Key> {
        self.lock().state.record().key()
    }

    pub fn is_fetched(&self) -> bool {
        self.lock().state.is_fetched()
    }

    /// Reads one value, fetching the full record first if the value is blank
    /// and this instance has not been fetched yet.
    pub fn field<T, F>(&self, pick: F) -> Result<T, RefineError>
    where
        T: Blank,
        F: Fn(&R) -> T,
    {
        let mut slot = self.lock();
        let value = pick(slot.state.record());
        if !value.is_blank() || slot.state.is_fetched() {
            return Ok(value);
        }
        let Some(key) = slot.state.record().key() else {
            return Ok(value);
        };

        let fresh = Arc::new(Self::fetch(&self.api, &key)?);
        let value = pick(&fresh);
        slot.state = LoadState::Fetched(fresh);
        Ok(value)
    }

    /// Fetches the full record unless already done (or impossible).
    pub fn ensure_loaded(&self) -> Result<Arc<R>, RefineError> {
        let mut slot = self.lock();
        if slot.state.is_fetched() {
            return Ok(slot.state.record().clone());
        }
        let Some(key) = slot.state.record().key() else {
            return Ok(slot.state.record().clone());
        };
        let fresh = Arc::new(Self::fetch(&self.api, &key)?);
        slot.state = LoadState::Fetched(fresh.clone());
        Ok(fresh)
    }

    pub(crate) fn update<F>(&self, edit: F)
    where
        F: FnOnce(&mut R),
    {
        let mut slot = self.lock();
        let mut record = R::clone(slot.state.record());
        edit(&mut record);
        slot.state = match slot.state {
            LoadState::Unfetched(_) => LoadState::Unfetched(Arc::new(record)),
            LoadState::Fetched(_) => LoadState::Fetched(Arc::new(record)),
        };
    }

    pub(crate) fn replace_fetched(&self, record: R) {
        self.lock().state = LoadState::Fetched(Arc::new(record));
    }

    pub fn downloaded_path(&self) -> Option<PathBuf> {
        self.lock().local_path.clone()
    }

    pub(crate) fn set_downloaded_path(&self, path: PathBuf) {
        self.lock().local_path = Some(path);
    }

    fn lock(&self) -> MutexGuard<'_, Slot<R>> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<R: Resource> Clone for Entity<R> {
    fn clone(&self) -> Self {
        Self {
            api: self.api.clone(),
            slot: Mutex::new(self.lock().clone()),
        }
    }
}

impl<R: Resource> PartialEq for Entity<R> {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl<R: Resource> fmt::Debug for Entity<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slot = self.lock();
        f.debug_struct(R::NAME)
            .field("fetched", &slot.state.is_fetched())
            .field("record", slot.state.record())
            .finish()
    }
}

impl<R: Resource> Serialize for Entity<R> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record().serialize(serializer)
    }
}

/// Generates one lazy accessor per listed record field.
macro_rules! lazy_fields {
    ($record:ty { $($name:ident: $ty:ty),* $(,)? }) => {
        impl $crate::entity::Entity<$record> {
            $(
                pub fn $name(&self) -> Result<$ty, $crate::error::RefineError> {
                    self.field(|record| record.$name.clone())
                }
            )*
        }
    };
}
pub(crate) use lazy_fields;

/// Serde adapter for API timestamps. Unparseable values become `None`.
pub mod timestamp {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn parse(raw: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(raw.trim())
            .ok()
            .map(|value| value.with_timezone(&Utc))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.as_deref().and_then(parse))
    }

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(value) => {
                serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, true))
            }
            None => serializer.serialize_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_rules() {
        assert!(None::<u8>.is_blank());
        assert!(!Some(0u8).is_blank());
        assert!(!Some(false).is_blank());
        assert!(Vec::<u8>::new().is_blank());
        assert!(!vec![1u8].is_blank());
    }

    #[test]
    fn timestamps_with_and_without_fraction() {
        let with = timestamp::parse("2020-10-19T19:30:36.157340Z").unwrap();
        let without = timestamp::parse("2020-10-19T19:30:36Z").unwrap();
        assert_eq!(with.timestamp(), without.timestamp());
        assert!(timestamp::parse("yesterday").is_none());
    }
}
