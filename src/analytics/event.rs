// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const FIELD_EVENT_NAME: &str = "event_name";
pub const FIELD_EVENT_ID: &str = "event_id";
pub const FIELD_PROFILE_ID: &str = "profile_id";
pub const FIELD_INSTALLATION_META_ID: &str = "profile_installation_meta_id";
pub const FIELD_SESSION_ID: &str = "session_id";
pub const FIELD_CREATED_AT: &str = "created_at";
pub const FIELD_PLATFORM: &str = "platform";

/// Analytics event kinds the SDK emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Live,
    PaywallShowed,
}

impl EventType {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Live => "live",
            Self::PaywallShowed => "paywall_showed",
        }
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One analytics event: flat string keys to string values.
///
/// Keys are kept sorted, so the JSON form of a record is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventRecord(BTreeMap<String, String>);

/// Who and when an event is stamped with.
#[derive(Debug, Clone)]
pub(crate) struct Stamp<'a> {
    pub profile_id: &'a str,
    pub installation_meta_id: &'a str,
    pub session_id: &'a str,
    pub platform: &'a str,
    pub at: DateTime<Utc>,
}

impl EventRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a stamped event. Caller-supplied `params` override stamped fields.
    pub(crate) fn stamped(
        event_type: EventType,
        stamp: &Stamp<'_>,
        params: HashMap<String, String>,
    ) -> Self {
        let mut record = Self::new();
        record.insert(FIELD_EVENT_NAME, event_type.as_str());
        record.insert(FIELD_EVENT_ID, Uuid::new_v4().to_string());
        record.insert(FIELD_PROFILE_ID, stamp.profile_id);
        record.insert(FIELD_INSTALLATION_META_ID, stamp.installation_meta_id);
        record.insert(FIELD_SESSION_ID, stamp.session_id);
        record.insert(
            FIELD_CREATED_AT,
            stamp.at.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        record.insert(FIELD_PLATFORM, stamp.platform);
        record.0.extend(params);
        record
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    #[must_use]
    pub fn event_name(&self) -> Option<&str> {
        self.get(FIELD_EVENT_NAME)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EventRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}
