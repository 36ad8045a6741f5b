use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use balloonhop_core::models::{
    AdminActionDraft, AdminActionType, AdminActionView, PilotDetails, PilotProfile, PilotStatus, StatusChange,
};
use balloonhop_core::ValidationErrors;

use crate::error::AppError;
use crate::extract::optional_json;
use crate::middleware::{require_admin, AuthUser};
use crate::state::AppState;

const RECENT_ACTIONS: i64 = 10;
const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 20;
const MAX_LIMIT: i64 = 100;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardResponse {
    pub pending_pilots: i64,
    pub total_pilots: i64,
    pub total_flights: i64,
    pub total_bookings: i64,
    pub recent_admin_actions: Vec<AdminActionView>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApproveRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ReasonRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TransitionResponse {
    pub message: String,
    pub pilot: PilotProfile,
}

#[derive(Debug, Default, Deserialize)]
pub struct ActionsQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub pages: i64,
}

#[derive(Debug, Serialize)]
pub struct ActionsResponse {
    pub actions: Vec<AdminActionView>,
    pub pagination: Pagination,
}

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/admin/dashboard", get(dashboard))
        .route("/admin/pilots/pending", get(pending_pilots))
        .route("/admin/pilots/{pilot_id}", get(pilot_details))
        .route("/admin/pilots/{pilot_id}/approve", post(approve_pilot))
        .route("/admin/pilots/{pilot_id}/reject", post(reject_pilot))
        .route("/admin/pilots/{pilot_id}/suspend", post(suspend_pilot))
        .route("/admin/actions", get(list_actions))
        .route_layer(middleware::from_fn_with_state(state, require_admin))
}

// ============================================================================
// Dashboard & Review Queue
// ============================================================================

/// GET /admin/dashboard
pub async fn dashboard(State(state): State<AppState>) -> Result<Json<DashboardResponse>, AppError> {
    let (pending_pilots, total_pilots, total_flights, total_bookings, recent_admin_actions) = tokio::try_join!(
        state.pilots.count_pilots(Some(PilotStatus::Pending)),
        state.pilots.count_pilots(None),
        state.flights.count_flights(),
        state.bookings.count_bookings(),
        state.admin.list_actions(0, RECENT_ACTIONS),
    )?;

    Ok(Json(DashboardResponse {
        pending_pilots,
        total_pilots,
        total_flights,
        total_bookings,
        recent_admin_actions,
    }))
}

/// GET /admin/pilots/pending
pub async fn pending_pilots(State(state): State<AppState>) -> Result<Json<Vec<PilotDetails>>, AppError> {
    Ok(Json(state.pilots.list_pilot_details(PilotStatus::Pending).await?))
}

/// GET /admin/pilots/{pilotId}
pub async fn pilot_details(
    State(state): State<AppState>,
    Path(pilot_id): Path<Uuid>,
) -> Result<Json<PilotDetails>, AppError> {
    state
        .pilots
        .pilot_details(pilot_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFoundError("Pilot not found".to_string()))
}

// ============================================================================
// Status Transitions
// ============================================================================

/// POST /admin/pilots/{pilotId}/approve
pub async fn approve_pilot(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(pilot_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<TransitionResponse>, AppError> {
    let request: ApproveRequest = optional_json(&body)?;
    transition(&state, &admin, pilot_id, AdminActionType::PilotApproved, ("notes", request.notes)).await
}

/// POST /admin/pilots/{pilotId}/reject
pub async fn reject_pilot(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(pilot_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<TransitionResponse>, AppError> {
    let request: ReasonRequest = optional_json(&body)?;
    transition(&state, &admin, pilot_id, AdminActionType::PilotRejected, ("reason", request.reason)).await
}

/// POST /admin/pilots/{pilotId}/suspend
pub async fn suspend_pilot(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthUser>,
    Path(pilot_id): Path<Uuid>,
    body: Bytes,
) -> Result<Json<TransitionResponse>, AppError> {
    let request: ReasonRequest = optional_json(&body)?;
    transition(&state, &admin, pilot_id, AdminActionType::PilotSuspended, ("reason", request.reason)).await
}

fn success_message(action: AdminActionType) -> &'static str {
    match action {
        AdminActionType::PilotApproved => "Pilot approved successfully",
        AdminActionType::PilotRejected => "Pilot rejected successfully",
        AdminActionType::PilotSuspended => "Pilot suspended successfully",
    }
}

async fn transition(
    state: &AppState,
    admin: &AuthUser,
    pilot_id: Uuid,
    action: AdminActionType,
    (note_key, note): (&str, Option<String>),
) -> Result<Json<TransitionResponse>, AppError> {
    let details = state
        .pilots
        .pilot_details(pilot_id)
        .await?
        .ok_or_else(|| AppError::NotFoundError("Pilot not found".to_string()))?;

    let target = action.target_status();
    let mut audit = serde_json::Map::new();
    audit.insert(note_key.to_string(), json!(note));
    audit.insert("pilotEmail".to_string(), json!(details.user.email));

    let change = state
        .pilots
        .transition_status(
            pilot_id,
            target,
            AdminActionDraft {
                admin_id: admin.user_id,
                action_type: action,
                target_id: pilot_id,
                details: audit.into(),
            },
        )
        .await?;
    let pilot = match change {
        StatusChange::Applied(pilot) => pilot,
        StatusChange::Unchanged(status) => {
            return Err(AppError::ConflictError(format!("Pilot is already {}", status)));
        }
        StatusChange::NotFound => return Err(AppError::NotFoundError("Pilot not found".to_string())),
    };

    tracing::info!(%pilot_id, admin_id = %admin.user_id, action = %action, "Pilot status changed");
    Ok(Json(TransitionResponse {
        message: success_message(action).to_string(),
        pilot,
    }))
}

// ============================================================================
// Audit Log
// ============================================================================

fn parse_bounded(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<String>,
    default: i64,
    max: Option<i64>,
) -> i64 {
    let Some(raw) = raw.filter(|r| !r.is_empty()) else {
        return default;
    };
    match raw.parse::<i64>() {
        Ok(n) if n >= 1 && max.map_or(true, |m| n <= m) => n,
        _ => {
            match max {
                Some(m) => errors.add(field, format!("Must be an integer between 1 and {}", m)),
                None => errors.add(field, "Must be a positive integer"),
            }
            default
        }
    }
}

impl ActionsQuery {
    pub fn resolve(self) -> Result<(i64, i64), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let page = parse_bounded(&mut errors, "page", self.page, DEFAULT_PAGE, None);
        let limit = parse_bounded(&mut errors, "limit", self.limit, DEFAULT_LIMIT, Some(MAX_LIMIT));
        errors.finish(|| (page, limit))
    }
}

impl Pagination {
    pub fn new(page: i64, limit: i64, total: i64) -> Self {
        Self {
            page,
            limit,
            total,
            pages: (total + limit - 1) / limit,
        }
    }
}

/// GET /admin/actions
pub async fn list_actions(
    State(state): State<AppState>,
    Query(query): Query<ActionsQuery>,
) -> Result<Json<ActionsResponse>, AppError> {
    let (page, limit) = query.resolve().map_err(AppError::InvalidInput)?;
    let offset = (page - 1).saturating_mul(limit);

    let (actions, total) = tokio::try_join!(state.admin.list_actions(offset, limit), state.admin.count_actions())?;
    Ok(Json(ActionsResponse {
        actions,
        pagination: Pagination::new(page, limit, total),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(page: Option<&str>, limit: Option<&str>) -> ActionsQuery {
        ActionsQuery {
            page: page.map(String::from),
            limit: limit.map(String::from),
        }
    }

    #[test]
    fn test_pagination_defaults_and_bounds() {
        assert_eq!(query(None, None).resolve().unwrap(), (1, 20));
        assert_eq!(query(Some("3"), Some("100")).resolve().unwrap(), (3, 100));

        let errors = query(Some("0"), Some("101")).resolve().unwrap_err();
        assert!(errors.has_field("page"));
        assert!(errors.has_field("limit"));
        assert!(query(Some("abc"), None).resolve().is_err());
    }

    #[test]
    fn test_page_count_rounds_up() {
        assert_eq!(Pagination::new(1, 20, 0).pages, 0);
        assert_eq!(Pagination::new(1, 20, 20).pages, 1);
        assert_eq!(Pagination::new(1, 20, 21).pages, 2);
    }
}
