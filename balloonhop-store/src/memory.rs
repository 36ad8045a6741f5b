//! In-process store behind `database.url = "memory://"`. All tables live under
//! one mutex, so every trait method is a single atomic step.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use balloonhop_core::models::{
    AdminAction, AdminActionDraft, AdminActionView, AdminIdentity, Booking, ConnectAccountStatus, FeatureFlag,
    Festival, Flight, FlightStatus, NewFlight, NewSubscription, NewUser, NotificationSubscription, PaymentStatus,
    PilotApplication, PilotDetails, PilotProfile, PilotStatus, PilotSummary, ReservationRequest, StatusChange,
    User, UserSummary,
};
use balloonhop_core::payment::FlightProduct;
use balloonhop_core::repository::{
    AdminRepository, BookingRepository, CatalogRepository, FlightRepository, NotificationRepository,
    PilotRegistrationRecord, PilotRepository, UserRepository,
};
use balloonhop_core::reservation::quote_seats;
use balloonhop_core::{ReservationError, StoreError, StoreResult};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    pilots: HashMap<Uuid, PilotProfile>,
    applications: Vec<PilotApplication>,
    flights: HashMap<Uuid, Flight>,
    bookings: HashMap<Uuid, Booking>,
    admin_actions: Vec<AdminAction>,
    subscriptions: Vec<NotificationSubscription>,
    festivals: Vec<Festival>,
    feature_flags: Vec<FeatureFlag>,
}

impl Tables {
    fn check_unique_user(&self, user: &User) -> StoreResult<()> {
        if self.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Conflict("users_email_key".to_string()));
        }
        if self.users.values().any(|u| u.phone_number == user.phone_number) {
            return Err(StoreError::Conflict("users_phone_number_key".to_string()));
        }
        Ok(())
    }

    fn details(&self, profile: &PilotProfile) -> StoreResult<PilotDetails> {
        let user = self
            .users
            .get(&profile.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", profile.user_id)))?;
        let latest_application = self
            .applications
            .iter()
            .filter(|a| a.pilot_id == profile.pilot_id)
            .max_by_key(|a| a.created_at)
            .cloned();
        Ok(PilotDetails {
            profile: profile.clone(),
            user: UserSummary::from(user),
            latest_application,
        })
    }

    fn pilot_mut(&mut self, pilot_id: Uuid) -> StoreResult<&mut PilotProfile> {
        self.pilots
            .get_mut(&pilot_id)
            .ok_or_else(|| StoreError::NotFound(format!("pilot {}", pilot_id)))
    }

    fn booking_mut(&mut self, booking_id: Uuid) -> StoreResult<&mut Booking> {
        self.bookings
            .get_mut(&booking_id)
            .ok_or_else(|| StoreError::NotFound(format!("booking {}", booking_id)))
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a fully formed user, e.g. an admin account that has no signup route.
    pub async fn insert_user(&self, user: User) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;
        tables.check_unique_user(&user)?;
        tables.users.insert(user.user_id, user.clone());
        Ok(user)
    }

    pub async fn insert_flight(&self, flight: Flight) -> Flight {
        self.tables.lock().await.flights.insert(flight.flight_id, flight.clone());
        flight
    }

    pub async fn set_flight_status(&self, flight_id: Uuid, status: FlightStatus) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let flight = tables
            .flights
            .get_mut(&flight_id)
            .ok_or_else(|| StoreError::NotFound(format!("flight {}", flight_id)))?;
        flight.status = status;
        flight.updated_at = Utc::now();
        Ok(())
    }

    pub async fn insert_festival(&self, festival: Festival) {
        self.tables.lock().await.festivals.push(festival);
    }

    pub async fn set_feature_flag(&self, flag: FeatureFlag) {
        let mut tables = self.tables.lock().await;
        tables.feature_flags.retain(|f| f.key != flag.key);
        tables.feature_flags.push(flag);
    }
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> StoreResult<User> {
        self.insert_user(user.into_user(Utc::now())).await
    }

    async fn register_pilot(
        &self,
        user: NewUser,
        pilot_license_number: String,
    ) -> StoreResult<PilotRegistrationRecord> {
        let now = Utc::now();
        let user = user.into_user(now);
        let pilot = PilotProfile::new(user.user_id, now);
        let application = PilotApplication::new(pilot.pilot_id, pilot_license_number, now);

        let mut tables = self.tables.lock().await;
        tables.check_unique_user(&user)?;
        tables.users.insert(user.user_id, user.clone());
        tables.pilots.insert(pilot.pilot_id, pilot.clone());
        tables.applications.push(application.clone());

        Ok(PilotRegistrationRecord {
            user,
            pilot,
            application,
        })
    }

    async fn find_user(&self, user_id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.tables.lock().await.users.get(&user_id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user_by_phone(&self, phone_number: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.values().find(|u| u.phone_number == phone_number).cloned())
    }
}

#[async_trait]
impl PilotRepository for MemoryStore {
    async fn find_pilot(&self, pilot_id: Uuid) -> StoreResult<Option<PilotProfile>> {
        Ok(self.tables.lock().await.pilots.get(&pilot_id).cloned())
    }

    async fn find_pilot_by_user(&self, user_id: Uuid) -> StoreResult<Option<PilotProfile>> {
        let tables = self.tables.lock().await;
        Ok(tables.pilots.values().find(|p| p.user_id == user_id).cloned())
    }

    async fn find_pilot_by_connect_account(&self, account_id: &str) -> StoreResult<Option<PilotProfile>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .pilots
            .values()
            .find(|p| p.stripe_connect_account_id.as_deref() == Some(account_id))
            .cloned())
    }

    async fn pilot_details(&self, pilot_id: Uuid) -> StoreResult<Option<PilotDetails>> {
        let tables = self.tables.lock().await;
        tables.pilots.get(&pilot_id).map(|p| tables.details(p)).transpose()
    }

    async fn list_pilot_details(&self, status: PilotStatus) -> StoreResult<Vec<PilotDetails>> {
        let tables = self.tables.lock().await;
        let mut pilots: Vec<&PilotProfile> = tables.pilots.values().filter(|p| p.status == status).collect();
        pilots.sort_by_key(|p| p.created_at);
        pilots.into_iter().map(|p| tables.details(p)).collect()
    }

    async fn list_approved_pilots(&self) -> StoreResult<Vec<PilotSummary>> {
        let tables = self.tables.lock().await;
        let mut summaries: Vec<PilotSummary> = tables
            .pilots
            .values()
            .filter(|p| p.status == PilotStatus::Approved)
            .filter_map(|p| {
                tables.users.get(&p.user_id).map(|u| PilotSummary {
                    pilot_id: p.pilot_id,
                    name: u.display_name(),
                })
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    async fn transition_status(
        &self,
        pilot_id: Uuid,
        status: PilotStatus,
        action: AdminActionDraft,
    ) -> StoreResult<StatusChange> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let Some(pilot) = tables.pilots.get_mut(&pilot_id) else {
            return Ok(StatusChange::NotFound);
        };
        if pilot.status == status {
            return Ok(StatusChange::Unchanged(status));
        }
        pilot.status = status;
        pilot.updated_at = now;
        let pilot = pilot.clone();
        tables.admin_actions.push(action.into_action(now));
        Ok(StatusChange::Applied(pilot))
    }

    async fn link_connect_account(
        &self,
        pilot_id: Uuid,
        account_id: &str,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile> {
        let mut tables = self.tables.lock().await;
        let pilot = tables.pilot_mut(pilot_id)?;
        pilot.stripe_connect_account_id = Some(account_id.to_string());
        pilot.stripe_account_status = Some(status);
        pilot.updated_at = Utc::now();
        Ok(pilot.clone())
    }

    async fn update_connect_status(
        &self,
        pilot_id: Uuid,
        status: ConnectAccountStatus,
    ) -> StoreResult<PilotProfile> {
        let mut tables = self.tables.lock().await;
        let pilot = tables.pilot_mut(pilot_id)?;
        pilot.stripe_account_status = Some(status);
        pilot.updated_at = Utc::now();
        Ok(pilot.clone())
    }

    async fn count_pilots(&self, status: Option<PilotStatus>) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .pilots
            .values()
            .filter(|p| status.map_or(true, |s| p.status == s))
            .count();
        Ok(count as i64)
    }
}

#[async_trait]
impl FlightRepository for MemoryStore {
    async fn create_flight(&self, flight: NewFlight) -> StoreResult<Flight> {
        Ok(self.insert_flight(flight.into_flight(Utc::now())).await)
    }

    async fn get_flight(&self, flight_id: Uuid) -> StoreResult<Option<Flight>> {
        Ok(self.tables.lock().await.flights.get(&flight_id).cloned())
    }

    async fn list_flights(&self, status: Option<FlightStatus>) -> StoreResult<Vec<Flight>> {
        let tables = self.tables.lock().await;
        let mut flights: Vec<Flight> = tables
            .flights
            .values()
            .filter(|f| status.map_or(true, |s| f.status == s))
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.meetup_timestamp);
        Ok(flights)
    }

    async fn list_pilot_flights(&self, pilot_id: Uuid) -> StoreResult<Vec<Flight>> {
        let tables = self.tables.lock().await;
        let mut flights: Vec<Flight> = tables
            .flights
            .values()
            .filter(|f| f.pilot_id == pilot_id)
            .cloned()
            .collect();
        flights.sort_by_key(|f| f.meetup_timestamp);
        Ok(flights)
    }

    async fn attach_stripe_product(&self, flight_id: Uuid, product: &FlightProduct) -> StoreResult<Flight> {
        let mut tables = self.tables.lock().await;
        let flight = tables
            .flights
            .get_mut(&flight_id)
            .ok_or_else(|| StoreError::NotFound(format!("flight {}", flight_id)))?;
        flight.stripe_product_id = Some(product.product_id.clone());
        flight.stripe_price_id = Some(product.price_id.clone());
        flight.stripe_payment_link_id = Some(product.payment_link_id.clone());
        flight.updated_at = Utc::now();
        Ok(flight.clone())
    }

    async fn count_flights(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().await.flights.len() as i64)
    }
}

#[async_trait]
impl BookingRepository for MemoryStore {
    async fn reserve_seats(&self, request: &ReservationRequest) -> Result<Booking, ReservationError> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;

        let flight = tables
            .flights
            .get(&request.flight_id)
            .ok_or(ReservationError::FlightNotFound(request.flight_id))?;
        let split = quote_seats(flight, request.number_of_seats)?;

        if !tables.users.contains_key(&request.passenger_id) {
            return Err(ReservationError::PassengerNotFound(request.passenger_id));
        }

        let booking = Booking::pending(request, split, now);
        if let Some(flight) = tables.flights.get_mut(&request.flight_id) {
            flight.seats_reserved += request.number_of_seats;
            flight.updated_at = now;
        }
        tables.bookings.insert(booking.booking_id, booking.clone());
        Ok(booking)
    }

    async fn attach_payment_intent(&self, booking_id: Uuid, intent_id: &str) -> StoreResult<Booking> {
        let mut tables = self.tables.lock().await;
        let booking = tables.booking_mut(booking_id)?;
        booking.stripe_payment_intent_id = Some(intent_id.to_string());
        booking.updated_at = Utc::now();
        Ok(booking.clone())
    }

    async fn release_reservation(&self, booking_id: Uuid, status: PaymentStatus) -> StoreResult<Option<Booking>> {
        let now = Utc::now();
        let mut tables = self.tables.lock().await;
        let Some(booking) = tables.bookings.get_mut(&booking_id) else {
            return Ok(None);
        };
        if booking.payment_status != PaymentStatus::Pending {
            return Ok(None);
        }
        booking.payment_status = status;
        booking.updated_at = now;
        let booking = booking.clone();

        if let Some(flight) = tables.flights.get_mut(&booking.flight_id) {
            flight.seats_reserved = (flight.seats_reserved - booking.number_of_seats).max(0);
            flight.updated_at = now;
        }
        Ok(Some(booking))
    }

    async fn mark_paid(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        let mut tables = self.tables.lock().await;
        let Some(booking) = tables.bookings.get_mut(&booking_id) else {
            return Ok(None);
        };
        if booking.payment_status != PaymentStatus::Pending {
            return Ok(None);
        }
        booking.payment_status = PaymentStatus::Paid;
        booking.updated_at = Utc::now();
        Ok(Some(booking.clone()))
    }

    async fn get_booking(&self, booking_id: Uuid) -> StoreResult<Option<Booking>> {
        Ok(self.tables.lock().await.bookings.get(&booking_id).cloned())
    }

    async fn find_by_payment_intent(&self, intent_id: &str) -> StoreResult<Option<Booking>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .bookings
            .values()
            .find(|b| b.stripe_payment_intent_id.as_deref() == Some(intent_id))
            .cloned())
    }

    async fn list_flight_bookings(&self, flight_id: Uuid) -> StoreResult<Vec<Booking>> {
        let tables = self.tables.lock().await;
        let mut bookings: Vec<Booking> = tables
            .bookings
            .values()
            .filter(|b| b.flight_id == flight_id)
            .cloned()
            .collect();
        bookings.sort_by_key(|b| b.created_at);
        Ok(bookings)
    }

    async fn passenger_phone_numbers(&self, flight_id: Uuid) -> StoreResult<Vec<String>> {
        let tables = self.tables.lock().await;
        let mut phones: Vec<String> = tables
            .bookings
            .values()
            .filter(|b| b.flight_id == flight_id && b.payment_status.holds_seats())
            .filter_map(|b| tables.users.get(&b.passenger_id))
            .map(|u| u.phone_number.clone())
            .collect();
        phones.sort();
        phones.dedup();
        Ok(phones)
    }

    async fn count_bookings(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().await.bookings.len() as i64)
    }
}

#[async_trait]
impl AdminRepository for MemoryStore {
    async fn list_actions(&self, offset: i64, limit: i64) -> StoreResult<Vec<AdminActionView>> {
        let tables = self.tables.lock().await;
        let mut actions: Vec<&AdminAction> = tables.admin_actions.iter().collect();
        actions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(actions
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .map(|action| AdminActionView {
                admin: tables.users.get(&action.admin_id).map(|u| AdminIdentity {
                    first_name: u.first_name.clone(),
                    last_name: u.last_name.clone(),
                    email: u.email.clone(),
                }),
                action: action.clone(),
            })
            .collect())
    }

    async fn count_actions(&self) -> StoreResult<i64> {
        Ok(self.tables.lock().await.admin_actions.len() as i64)
    }
}

#[async_trait]
impl NotificationRepository for MemoryStore {
    async fn find_subscription(
        &self,
        email: Option<&str>,
        phone_number: Option<&str>,
    ) -> StoreResult<Option<NotificationSubscription>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .subscriptions
            .iter()
            .find(|s| {
                (email.is_some() && s.email.as_deref() == email)
                    || (phone_number.is_some() && s.phone_number.as_deref() == phone_number)
            })
            .cloned())
    }

    async fn create_subscription(&self, subscription: NewSubscription) -> StoreResult<NotificationSubscription> {
        let subscription = subscription.into_subscription(Utc::now());
        self.tables.lock().await.subscriptions.push(subscription.clone());
        Ok(subscription)
    }
}

#[async_trait]
impl CatalogRepository for MemoryStore {
    async fn upcoming_festivals(&self, now: DateTime<Utc>) -> StoreResult<Vec<Festival>> {
        let tables = self.tables.lock().await;
        let mut festivals: Vec<Festival> = tables.festivals.iter().filter(|f| f.end_date >= now).cloned().collect();
        festivals.sort_by_key(|f| f.start_date);
        Ok(festivals)
    }

    async fn feature_flags(&self) -> StoreResult<Vec<FeatureFlag>> {
        let mut flags = self.tables.lock().await.feature_flags.clone();
        flags.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(flags)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use balloonhop_core::models::{AdminActionType, LaunchLocation, Role};
    use chrono::Duration;
    use std::sync::Arc;

    fn new_user(email: &str, phone: &str) -> NewUser {
        NewUser {
            first_name: "Test".into(),
            last_name: "Passenger".into(),
            email: email.into(),
            phone_number: phone.into(),
            home_zip_code: None,
            password_hash: "hash".into(),
            role: Role::Passenger,
        }
    }

    async fn flight(store: &MemoryStore, seats: i32) -> Flight {
        store
            .create_flight(NewFlight {
                pilot_id: Uuid::new_v4(),
                launch_location: LaunchLocation::point(-106.59, 35.19),
                meetup_timestamp: Utc::now() + Duration::days(2),
                estimated_duration_minutes: 60,
                price_per_seat_cents: 20_000,
                total_seats: seats,
                description: None,
                platform_fee_bps: 1000,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_email_or_phone_conflicts() {
        let store = MemoryStore::new();
        store.create_user(new_user("a@example.com", "+15550000001")).await.unwrap();
        let dup_email = store.create_user(new_user("a@example.com", "+15550000002")).await;
        assert!(matches!(dup_email, Err(StoreError::Conflict(_))));
        let dup_phone = store.create_user(new_user("b@example.com", "+15550000001")).await;
        assert!(matches!(dup_phone, Err(StoreError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_reservation_checks_run_in_order() {
        let store = MemoryStore::new();
        let flight = flight(&store, 2).await;
        let ghost = Uuid::new_v4();

        // Seats are checked before the passenger.
        let err = store
            .reserve_seats(&ReservationRequest {
                flight_id: flight.flight_id,
                passenger_id: ghost,
                number_of_seats: 3,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::InsufficientSeats { requested: 3, available: 2 }));

        let err = store
            .reserve_seats(&ReservationRequest {
                flight_id: flight.flight_id,
                passenger_id: ghost,
                number_of_seats: 1,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ReservationError::PassengerNotFound(_)));

        let unchanged = store.get_flight(flight.flight_id).await.unwrap().unwrap();
        assert_eq!(unchanged.seats_reserved, 0);
        assert_eq!(store.count_bookings().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_release_is_idempotent() {
        let store = MemoryStore::new();
        let flight = flight(&store, 4).await;
        let passenger = store.create_user(new_user("p@example.com", "+15550000003")).await.unwrap();

        let booking = store
            .reserve_seats(&ReservationRequest {
                flight_id: flight.flight_id,
                passenger_id: passenger.user_id,
                number_of_seats: 3,
            })
            .await
            .unwrap();
        assert_eq!(booking.total_amount_paid_cents, 60_000);
        assert_eq!(store.get_flight(flight.flight_id).await.unwrap().unwrap().seats_reserved, 3);

        let released = store
            .release_reservation(booking.booking_id, PaymentStatus::Failed)
            .await
            .unwrap();
        assert_eq!(released.unwrap().payment_status, PaymentStatus::Failed);
        assert!(store
            .release_reservation(booking.booking_id, PaymentStatus::Failed)
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.get_flight(flight.flight_id).await.unwrap().unwrap().seats_reserved, 0);
    }

    #[tokio::test]
    async fn test_concurrent_reservations_never_oversell() {
        let store = Arc::new(MemoryStore::new());
        let flight = flight(&store, 5).await;
        let passenger = store.create_user(new_user("c@example.com", "+15550000004")).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = store.clone();
            let request = ReservationRequest {
                flight_id: flight.flight_id,
                passenger_id: passenger.user_id,
                number_of_seats: 2,
            };
            handles.push(tokio::spawn(async move { store.reserve_seats(&request).await.is_ok() }));
        }

        let mut succeeded = 0;
        for handle in handles {
            if handle.await.unwrap() {
                succeeded += 1;
            }
        }
        assert_eq!(succeeded, 2);
        assert_eq!(store.get_flight(flight.flight_id).await.unwrap().unwrap().seats_reserved, 4);
    }

    #[tokio::test]
    async fn test_concurrent_identical_transitions_apply_once() {
        let store = Arc::new(MemoryStore::new());
        let record = store
            .register_pilot(new_user("pilot@example.com", "+15550000005"), "FAA-1".into())
            .await
            .unwrap();
        let pilot_id = record.pilot.pilot_id;

        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            let draft = AdminActionDraft {
                admin_id: Uuid::new_v4(),
                action_type: AdminActionType::PilotApproved,
                target_id: pilot_id,
                details: serde_json::json!({ "notes": null }),
            };
            handles.push(tokio::spawn(async move {
                store.transition_status(pilot_id, PilotStatus::Approved, draft).await.unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            match handle.await.unwrap() {
                StatusChange::Applied(pilot) => {
                    assert_eq!(pilot.status, PilotStatus::Approved);
                    applied += 1;
                }
                StatusChange::Unchanged(status) => assert_eq!(status, PilotStatus::Approved),
                StatusChange::NotFound => panic!("pilot vanished"),
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(store.count_actions().await.unwrap(), 1);

        let missing = store
            .transition_status(
                Uuid::new_v4(),
                PilotStatus::Suspended,
                AdminActionDraft {
                    admin_id: Uuid::new_v4(),
                    action_type: AdminActionType::PilotSuspended,
                    target_id: pilot_id,
                    details: serde_json::json!({}),
                },
            )
            .await
            .unwrap();
        assert!(matches!(missing, StatusChange::NotFound));
        assert_eq!(store.count_actions().await.unwrap(), 1);
    }
}
