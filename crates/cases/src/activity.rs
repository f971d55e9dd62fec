//! Activity-log entries nested under a ticket.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use strata_core::{Entity, MemberId, bounded_string};

bounded_string!(
    /// Free-text note attached to an activity entry.
    pub ActivityDescription, min = 0, max = 2000
);

/// Identifier of one activity-log entry.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActivityDetailId(Uuid);

impl ActivityDetailId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ActivityDetailId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for ActivityDetailId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// What kind of activity an entry records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityType {
    Created,
    Submitted,
    Assigned,
    InProgress,
    Completed,
    Paid,
    Closed,
    Note,
}

/// Nested entity: one entry in a ticket's activity log.
///
/// Owned by its ticket; appended through the owner's permission-gated
/// methods, never replaced from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityDetail {
    id: ActivityDetailId,
    activity_type: ActivityType,
    description: Option<ActivityDescription>,
    activity_by: Option<MemberId>,
    created_at: DateTime<Utc>,
}

impl ActivityDetail {
    pub(crate) fn new(
        activity_type: ActivityType,
        description: Option<ActivityDescription>,
        activity_by: Option<MemberId>,
    ) -> Self {
        Self {
            id: ActivityDetailId::new(),
            activity_type,
            description,
            activity_by,
            created_at: Utc::now(),
        }
    }

    pub fn activity_type(&self) -> ActivityType {
        self.activity_type
    }

    pub fn description(&self) -> Option<&ActivityDescription> {
        self.description.as_ref()
    }

    /// `None` when a system/staff process produced the entry.
    pub fn activity_by(&self) -> Option<MemberId> {
        self.activity_by
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
}

impl Entity for ActivityDetail {
    type Id = ActivityDetailId;

    fn id(&self) -> &ActivityDetailId {
        &self.id
    }
}
