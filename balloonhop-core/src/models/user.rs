use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use garde::Validate;

use crate::validation::{trimmed, trimmed_opt, Checked, ValidationErrors};

text_enum!(Role, "role", {
    Passenger => "PASSENGER",
    Pilot => "PILOT",
    Admin => "ADMIN",
});

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub user_id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub home_zip_code: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name).trim().to_string()
    }
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub home_zip_code: Option<String>,
    pub password_hash: String,
    pub role: Role,
}

impl NewUser {
    pub fn into_user(self, now: DateTime<Utc>) -> User {
        User {
            user_id: Uuid::new_v4(),
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            home_zip_code: self.home_zip_code,
            password_hash: self.password_hash,
            role: self.role,
            created_at: now,
            updated_at: now,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 1, max = 100))]
    pub first_name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(email, length(max = 255))]
    pub email: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 5, max = 32))]
    pub phone_number: String,
    #[serde(default)]
    #[garde(length(chars, min = 8))]
    pub password: String,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[garde(length(chars, min = 3, max = 10))]
    pub home_zip_code: Option<String>,
}

/// A checked signup. The password is still plaintext here; it is hashed
/// before it reaches a repository.
#[derive(Debug, Clone)]
pub struct Signup {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub password: String,
    pub home_zip_code: Option<String>,
}

impl Signup {
    pub fn into_new_user(self, password_hash: String, role: Role) -> NewUser {
        NewUser {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            home_zip_code: self.home_zip_code,
            password_hash,
            role,
        }
    }
}

impl Checked for SignupRequest {
    type Output = Signup;

    fn normalize(self) -> Result<Signup, ValidationErrors> {
        Ok(Signup {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email.to_lowercase(),
            phone_number: self.phone_number,
            password: self.password,
            home_zip_code: self.home_zip_code,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(email, length(max = 255))]
    pub email: String,
    #[serde(default)]
    #[garde(length(chars, min = 8))]
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
}

impl Checked for LoginRequest {
    type Output = Login;

    fn normalize(self) -> Result<Login, ValidationErrors> {
        Ok(Login {
            email: self.email.to_lowercase(),
            password: self.password,
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct PilotRegisterRequest {
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 1, max = 100))]
    pub first_name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 1, max = 100))]
    pub last_name: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(email, length(max = 255))]
    pub email: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 5, max = 32))]
    pub phone_number: String,
    #[serde(default)]
    #[garde(length(chars, min = 8))]
    pub password: String,
    #[serde(default, deserialize_with = "trimmed")]
    #[garde(length(chars, min = 3, max = 64))]
    pub pilot_license_number: String,
    #[serde(default, deserialize_with = "trimmed_opt")]
    #[garde(length(chars, min = 3, max = 10))]
    pub zip_code: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PilotRegistration {
    pub signup: Signup,
    pub pilot_license_number: String,
}

impl Checked for PilotRegisterRequest {
    type Output = PilotRegistration;

    fn normalize(self) -> Result<PilotRegistration, ValidationErrors> {
        let signup = SignupRequest {
            first_name: self.first_name,
            last_name: self.last_name,
            email: self.email,
            phone_number: self.phone_number,
            password: self.password,
            home_zip_code: self.zip_code,
        }
        .normalize()?;
        Ok(PilotRegistration {
            signup,
            pilot_license_number: self.pilot_license_number,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn signup() -> SignupRequest {
        SignupRequest {
            first_name: "Ada".into(),
            last_name: "Lovelace".into(),
            email: "Ada@Example.com".into(),
            phone_number: "+15551234567".into(),
            password: "correct horse".into(),
            home_zip_code: None,
        }
    }

    #[test]
    fn test_signup_normalizes_email() {
        let body: SignupRequest = serde_json::from_value(json!({
            "firstName": " Ada ",
            "lastName": "Lovelace",
            "email": " Ada@Example.com ",
            "phoneNumber": "+15551234567",
            "password": "correct horse"
        }))
        .unwrap();
        let signup = body.check().unwrap();
        assert_eq!(signup.first_name, "Ada");
        assert_eq!(signup.email, "ada@example.com");
        assert_eq!(signup.password, "correct horse");
    }

    #[test]
    fn test_signup_reports_every_bad_field() {
        let req = SignupRequest {
            email: "not-an-email".into(),
            password: "short".into(),
            phone_number: "123".into(),
            ..SignupRequest::default()
        };
        let errors = req.check().unwrap_err();
        assert!(errors.has_field("firstName"));
        assert!(errors.has_field("lastName"));
        assert!(errors.has_field("email"));
        assert!(errors.has_field("password"));
        assert!(errors.has_field("phoneNumber"));
        assert!(!errors.has_field("homeZipCode"));
    }

    #[test]
    fn test_email_longer_than_column_is_rejected() {
        let long_domain = format!("{}com", format!("{}.", "a".repeat(60)).repeat(5));
        let mut req = signup();
        req.email = format!("ada@{}", long_domain);
        let errors = req.check().unwrap_err();
        assert_eq!(errors.field_errors.keys().collect::<Vec<_>>(), vec!["email"]);

        let login = LoginRequest {
            email: format!("ada@{}", long_domain),
            password: "correct horse".into(),
        };
        assert!(login.check().unwrap_err().has_field("email"));
    }

    #[test]
    fn test_pilot_registration_needs_license() {
        let req = PilotRegisterRequest {
            first_name: "Bertrand".into(),
            last_name: "Piccard".into(),
            email: "bertrand@example.com".into(),
            phone_number: "+41790000000".into(),
            password: "orbiter3-1999".into(),
            pilot_license_number: String::new(),
            zip_code: Some("1".into()),
        };
        let errors = req.check().unwrap_err();
        assert!(errors.has_field("pilotLicenseNumber"));
        assert!(errors.has_field("zipCode"));
        assert!(!errors.has_field("email"));
    }
}
