use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use garde::Validate;

use crate::validation::{trimmed_opt, Checked, ValidationErrors};

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSubscription {
    pub subscription_id: Uuid,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub zip_code: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubscription {
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub zip_code: Option<String>,
}

impl NewSubscription {
    pub fn into_subscription(self, now: DateTime<Utc>) -> NotificationSubscription {
        NotificationSubscription {
            subscription_id: Uuid::new_v4(),
            email: self.email,
            phone_number: self.phone_number,
            zip_code: self.zip_code,
            created_at: now,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SubscribeRequest {
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[garde(email, length(max = 255))]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[garde(length(chars, min = 5, max = 32))]
    pub phone_number: Option<String>,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[garde(length(chars, min = 3, max = 10))]
    pub zip_code: Option<String>,
}

impl Checked for SubscribeRequest {
    type Output = NewSubscription;

    fn normalize(self) -> Result<NewSubscription, ValidationErrors> {
        if self.email.is_none() && self.phone_number.is_none() {
            return Err(ValidationErrors::form("email or phoneNumber required"));
        }
        Ok(NewSubscription {
            email: self.email.map(|e| e.to_lowercase()),
            phone_number: self.phone_number,
            zip_code: self.zip_code,
        })
    }
}
