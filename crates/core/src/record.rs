//! Record snapshots and field-level change semantics.
//!
//! A [`Record`] is one immutable version of a logical record. Updates never
//! touch an existing snapshot; [`Record::successor`] derives the next version
//! from the current one plus a set of [`FieldChanges`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{RecordId, Timestamp, VersionNumber};

/// Version number assigned to the first snapshot of every record.
pub const INITIAL_VERSION: VersionNumber = 1;

/// Flat string-to-string payload of a record.
///
/// Kept ordered so the persisted encoding is deterministic.
pub type RecordData = BTreeMap<String, String>;

/// One immutable version of a record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: RecordId,
    pub version: VersionNumber,
    pub data: RecordData,
    /// When version 1 was written; identical across all versions of an id.
    pub created_at: Timestamp,
    /// When this particular version was written.
    pub updated_at: Timestamp,
}

impl Record {
    /// Build the version-1 snapshot of a new record.
    pub fn initial(id: RecordId, data: RecordData, now: Timestamp) -> Self {
        Self {
            id,
            version: INITIAL_VERSION,
            data,
            created_at: now,
            updated_at: now,
        }
    }

    /// Build the snapshot that follows `self` once `changes` are applied.
    ///
    /// `created_at` is carried forward. `updated_at` never moves backwards,
    /// even if the wall clock does.
    pub fn successor(&self, changes: &FieldChanges, now: Timestamp) -> Self {
        Self {
            id: self.id,
            version: self.version + 1,
            data: changes.apply(&self.data),
            created_at: self.created_at,
            updated_at: now.max(self.updated_at),
        }
    }
}

/// A per-key instruction applied during an update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldChange {
    /// Set or overwrite the key's value.
    Set(String),
    /// Remove the key. No-op when the key is absent.
    Delete,
}

impl From<Option<String>> for FieldChange {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) => Self::Set(v),
            None => Self::Delete,
        }
    }
}

impl From<FieldChange> for Option<String> {
    fn from(change: FieldChange) -> Self {
        match change {
            FieldChange::Set(v) => Some(v),
            FieldChange::Delete => None,
        }
    }
}

/// A set of field changes keyed by field name.
///
/// Keys that are not present are left untouched. On the wire this is a JSON
/// object whose `null` values mean "delete this key".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, Option<String>>",
    into = "BTreeMap<String, Option<String>>"
)]
pub struct FieldChanges(BTreeMap<String, FieldChange>);

impl FieldChanges {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) a `Set` instruction for `key`.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), FieldChange::Set(value.into()));
        self
    }

    /// Add (or replace) a `Delete` instruction for `key`.
    pub fn delete(mut self, key: impl Into<String>) -> Self {
        self.0.insert(key.into(), FieldChange::Delete);
        self
    }

    pub fn get(&self, key: &str) -> Option<&FieldChange> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldChange)> {
        self.0.iter()
    }

    /// Return a copy of `data` with every change applied.
    pub fn apply(&self, data: &RecordData) -> RecordData {
        let mut next = data.clone();
        for (key, change) in &self.0 {
            match change {
                FieldChange::Set(value) => {
                    next.insert(key.clone(), value.clone());
                }
                FieldChange::Delete => {
                    next.remove(key);
                }
            }
        }
        next
    }

    /// The data a brand-new record gets from these changes.
    ///
    /// There is nothing to delete yet, so delete markers are dropped.
    pub fn initial_data(&self) -> RecordData {
        self.apply(&RecordData::new())
    }
}

impl From<BTreeMap<String, Option<String>>> for FieldChanges {
    fn from(raw: BTreeMap<String, Option<String>>) -> Self {
        Self(raw.into_iter().map(|(k, v)| (k, v.into())).collect())
    }
}

impl From<FieldChanges> for BTreeMap<String, Option<String>> {
    fn from(changes: FieldChanges) -> Self {
        changes.0.into_iter().map(|(k, v)| (k, v.into())).collect()
    }
}

impl FromIterator<(String, FieldChange)> for FieldChanges {
    fn from_iter<I: IntoIterator<Item = (String, FieldChange)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Validate that a record id is a positive integer.
pub fn validate_record_id(id: RecordId) -> Result<(), CoreError> {
    if id > 0 {
        Ok(())
    } else {
        Err(CoreError::InvalidId(id))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn data(pairs: &[(&str, &str)]) -> RecordData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn ts(secs: i64) -> Timestamp {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_set_overwrites_and_leaves_other_keys() {
        let current = data(&[("name", "John"), ("email", "j@x.com")]);
        let changes = FieldChanges::new().set("email", "j2@x.com");

        let next = changes.apply(&current);

        assert_eq!(next, data(&[("name", "John"), ("email", "j2@x.com")]));
    }

    #[test]
    fn test_delete_removes_key() {
        let current = data(&[("name", "John"), ("email", "j2@x.com")]);
        let changes = FieldChanges::new().delete("name");

        let next = changes.apply(&current);

        assert_eq!(next, data(&[("email", "j2@x.com")]));
        assert!(!next.contains_key("name"));
    }

    #[test]
    fn test_delete_missing_key_is_noop() {
        let current = data(&[("email", "j@x.com")]);
        let next = FieldChanges::new().delete("phone").apply(&current);
        assert_eq!(next, current);
    }

    #[test]
    fn test_set_and_delete_in_one_call() {
        let current = data(&[("a", "1"), ("b", "2")]);
        let changes = FieldChanges::new().set("c", "3").delete("a").set("b", "20");

        let next = changes.apply(&current);

        assert_eq!(next, data(&[("b", "20"), ("c", "3")]));
    }

    #[test]
    fn test_apply_does_not_mutate_source() {
        let current = data(&[("a", "1")]);
        let _ = FieldChanges::new().delete("a").apply(&current);
        assert_eq!(current, data(&[("a", "1")]));
    }

    #[test]
    fn test_initial_data_drops_delete_markers() {
        let changes = FieldChanges::new().set("name", "Jane").delete("email");
        assert_eq!(changes.initial_data(), data(&[("name", "Jane")]));
    }

    #[test]
    fn test_deserialize_null_as_delete() {
        let changes: FieldChanges =
            serde_json::from_str(r#"{"name": null, "email": "j@x.com"}"#).unwrap();

        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get("name"), Some(&FieldChange::Delete));
        assert_eq!(
            changes.get("email"),
            Some(&FieldChange::Set("j@x.com".to_string()))
        );
        assert_eq!(changes.get("phone"), None);
    }

    #[test]
    fn test_serialize_delete_as_null() {
        let changes = FieldChanges::new().delete("name");
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({ "name": null }));
    }

    #[test]
    fn test_successor_bumps_version_and_keeps_created_at() {
        let v1 = Record::initial(7, data(&[("name", "John")]), ts(0));
        let v2 = v1.successor(&FieldChanges::new().set("name", "Jim"), ts(10));

        assert_eq!(v2.id, 7);
        assert_eq!(v2.version, 2);
        assert_eq!(v2.created_at, v1.created_at);
        assert_eq!(v2.updated_at, ts(10));
        assert_eq!(v2.data, data(&[("name", "Jim")]));
        // The source snapshot is untouched.
        assert_eq!(v1.data, data(&[("name", "John")]));
    }

    #[test]
    fn test_successor_updated_at_never_goes_backwards() {
        let v1 = Record::initial(1, RecordData::new(), ts(100));
        let v2 = v1.successor(&FieldChanges::new(), ts(100) - Duration::seconds(30));
        assert_eq!(v2.updated_at, ts(100));
    }

    #[test]
    fn test_initial_snapshot_timestamps_match() {
        let v1 = Record::initial(3, RecordData::new(), ts(5));
        assert_eq!(v1.version, INITIAL_VERSION);
        assert_eq!(v1.created_at, v1.updated_at);
    }

    #[test]
    fn test_record_serializes_flat_fields() {
        let v1 = Record::initial(3, data(&[("name", "John")]), ts(0));
        let json = serde_json::to_value(&v1).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["version"], 1);
        assert_eq!(json["data"], serde_json::json!({ "name": "John" }));
        assert_eq!(json["created_at"], json["updated_at"]);
    }

    #[test]
    fn test_validate_record_id() {
        assert!(validate_record_id(1).is_ok());
        assert!(validate_record_id(i64::MAX).is_ok());
        assert_matches!(validate_record_id(0), Err(CoreError::InvalidId(0)));
        assert_matches!(validate_record_id(-4), Err(CoreError::InvalidId(-4)));
    }
}
