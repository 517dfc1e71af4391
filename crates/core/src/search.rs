use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::FileRecord;

/// Inclusive bounds on a record's `created_at`. Either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl DateRange {
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.start.is_none_or(|start| at >= start) && self.end.is_none_or(|end| at <= end)
    }
}

/// Conjunctive search filter over one owner's files.
///
/// Every populated field must match. An empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Case-insensitive substring of the display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Bounds on `created_at`.
    #[serde(default)]
    pub created: Option<DateRange>,
    /// Exact content type.
    #[serde(default)]
    pub content_type: Option<String>,
}

impl SearchFilter {
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn with_created(mut self, range: DateRange) -> Self {
        self.created = Some(range);
        self
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.name.as_deref().is_none_or(str::is_empty)
            && self.created.is_none()
            && self.content_type.as_deref().is_none_or(str::is_empty)
    }

    /// Evaluate the filter against a record. Ownership is not checked here.
    #[must_use]
    pub fn matches(&self, record: &FileRecord) -> bool {
        let name_ok = match self.name.as_deref() {
            None | Some("") => true,
            Some(needle) => record
                .name
                .to_lowercase()
                .contains(&needle.to_lowercase()),
        };
        let created_ok = self
            .created
            .is_none_or(|range| range.contains(record.created_at));
        let type_ok = match self.content_type.as_deref() {
            None | Some("") => true,
            Some(ct) => record.content_type == ct,
        };
        name_ok && created_ok && type_ok
    }
}
