use axum::{
    extract::{FromRequest, Request},
    Json,
};
use serde::de::DeserializeOwned;

use balloonhop_core::{Checked, ValidationErrors};

use crate::error::AppError;

/// JSON body deserialized as `T`, checked against its `garde` rules and
/// normalized into `T::Output`. Malformed JSON and failed rules are both 400s
/// in the flattened error shape.
pub struct Valid<T: Checked>(pub T::Output);

impl<S, T> FromRequest<S> for Valid<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Checked,
    T::Context: Default,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(body) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| AppError::InvalidInput(ValidationErrors::form(rejection.body_text())))?;
        body.check().map(Valid).map_err(AppError::InvalidInput)
    }
}

/// Parses a body that may be absent. An empty body yields `T::default()`.
pub fn optional_json<T>(body: &[u8]) -> Result<T, AppError>
where
    T: DeserializeOwned + Default,
{
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| AppError::InvalidInput(ValidationErrors::form(e.to_string())))
}
