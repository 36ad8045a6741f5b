use std::sync::Arc;

use sqlx::PgPool;

use balloonhop_core::repository::{
    AdminRepository, BookingRepository, CatalogRepository, FlightRepository, NotificationRepository,
    PilotRepository, UserRepository,
};

use crate::admin_repo::StoreAdminRepository;
use crate::booking_repo::StoreBookingRepository;
use crate::catalog_repo::StoreCatalogRepository;
use crate::flight_repo::StoreFlightRepository;
use crate::memory::MemoryStore;
use crate::pilot_repo::StorePilotRepository;
use crate::user_repo::StoreUserRepository;

/// One handle per repository trait, all backed by the same store.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub pilots: Arc<dyn PilotRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub admin: Arc<dyn AdminRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        let catalog = Arc::new(StoreCatalogRepository::new(pool.clone()));
        Self {
            users: Arc::new(StoreUserRepository::new(pool.clone())),
            pilots: Arc::new(StorePilotRepository::new(pool.clone())),
            flights: Arc::new(StoreFlightRepository::new(pool.clone())),
            bookings: Arc::new(StoreBookingRepository::new(pool.clone())),
            admin: Arc::new(StoreAdminRepository::new(pool)),
            notifications: catalog.clone(),
            catalog,
        }
    }

    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            users: store.clone(),
            pilots: store.clone(),
            flights: store.clone(),
            bookings: store.clone(),
            admin: store.clone(),
            notifications: store.clone(),
            catalog: store,
        }
    }
}
