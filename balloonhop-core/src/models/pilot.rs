use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::user::User;

text_enum!(PilotStatus, "pilot status", {
    Pending => "PENDING",
    Approved => "APPROVED",
    Rejected => "REJECTED",
    Suspended => "SUSPENDED",
});

text_enum!(ConnectAccountStatus, "connect account status", {
    Pending => "PENDING",
    Active => "ACTIVE",
    Restricted => "RESTRICTED",
    Disabled => "DISABLED",
});

text_enum!(LicenseVerificationStatus, "license verification status", {
    Pending => "PENDING",
    Verified => "VERIFIED",
    Failed => "FAILED",
});

/// Result of an admin status change, decided while the pilot row is held.
#[derive(Debug, Clone)]
pub enum StatusChange {
    Applied(PilotProfile),
    /// The pilot already had the requested status; nothing was written.
    Unchanged(PilotStatus),
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotProfile {
    pub pilot_id: Uuid,
    pub user_id: Uuid,
    pub status: PilotStatus,
    pub stripe_connect_account_id: Option<String>,
    pub stripe_account_status: Option<ConnectAccountStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PilotProfile {
    pub fn new(user_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            pilot_id: Uuid::new_v4(),
            user_id,
            status: PilotStatus::Pending,
            stripe_connect_account_id: None,
            stripe_account_status: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn can_create_flights(&self) -> bool {
        self.status == PilotStatus::Approved
    }

    /// The connected account to route payouts to, once Stripe has enabled it.
    pub fn payout_account(&self) -> Option<&str> {
        match self.stripe_account_status {
            Some(ConnectAccountStatus::Active) => self.stripe_connect_account_id.as_deref(),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotApplication {
    pub application_id: Uuid,
    pub pilot_id: Uuid,
    pub pilot_license_number: String,
    pub license_verification_status: LicenseVerificationStatus,
    pub created_at: DateTime<Utc>,
}

impl PilotApplication {
    pub fn new(pilot_id: Uuid, pilot_license_number: String, now: DateTime<Utc>) -> Self {
        Self {
            application_id: Uuid::new_v4(),
            pilot_id,
            pilot_license_number,
            license_verification_status: LicenseVerificationStatus::Pending,
            created_at: now,
        }
    }
}

/// The user fields an admin sees while reviewing a pilot.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub home_zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone_number: user.phone_number.clone(),
            home_zip_code: user.home_zip_code.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotDetails {
    #[serde(flatten)]
    pub profile: PilotProfile,
    pub user: UserSummary,
    pub latest_application: Option<PilotApplication>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PilotSummary {
    pub pilot_id: Uuid,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payout_account_requires_active_status() {
        let mut profile = PilotProfile::new(Uuid::new_v4(), Utc::now());
        profile.stripe_connect_account_id = Some("acct_123".into());
        profile.stripe_account_status = Some(ConnectAccountStatus::Pending);
        assert_eq!(profile.payout_account(), None);

        profile.stripe_account_status = Some(ConnectAccountStatus::Active);
        assert_eq!(profile.payout_account(), Some("acct_123"));
    }
}
