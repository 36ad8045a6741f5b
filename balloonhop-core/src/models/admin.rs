use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::pilot::PilotStatus;

text_enum!(AdminActionType, "admin action type", {
    PilotApproved => "PILOT_APPROVED",
    PilotRejected => "PILOT_REJECTED",
    PilotSuspended => "PILOT_SUSPENDED",
});

impl AdminActionType {
    pub fn target_status(&self) -> PilotStatus {
        match self {
            AdminActionType::PilotApproved => PilotStatus::Approved,
            AdminActionType::PilotRejected => PilotStatus::Rejected,
            AdminActionType::PilotSuspended => PilotStatus::Suspended,
        }
    }
}

/// Audit row for a privileged state change.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminAction {
    pub action_id: Uuid,
    pub admin_id: Uuid,
    pub action_type: AdminActionType,
    pub target_id: Uuid,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct AdminActionDraft {
    pub admin_id: Uuid,
    pub action_type: AdminActionType,
    pub target_id: Uuid,
    pub details: serde_json::Value,
}

impl AdminActionDraft {
    pub fn into_action(self, now: DateTime<Utc>) -> AdminAction {
        AdminAction {
            action_id: Uuid::new_v4(),
            admin_id: self.admin_id,
            action_type: self.action_type,
            target_id: self.target_id,
            details: self.details,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminIdentity {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminActionView {
    #[serde(flatten)]
    pub action: AdminAction,
    pub admin: Option<AdminIdentity>,
}
