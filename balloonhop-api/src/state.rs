use std::sync::Arc;

use balloonhop_core::auth::TokenKeys;
use balloonhop_core::notify::Notifier;
use balloonhop_core::payment::PaymentGateway;
use balloonhop_core::repository::{
    AdminRepository, BookingRepository, CatalogRepository, FlightRepository, NotificationRepository,
    PilotRepository, UserRepository,
};
use balloonhop_core::BookingService;
use balloonhop_store::app_config::{Config, Environment, RateLimitConfig};
use balloonhop_store::{RateLimiter, Repositories};

use crate::metrics::Metrics;

#[derive(Clone)]
pub struct AuthConfig {
    pub tokens: TokenKeys,
    pub admin_secret: Option<String>,
}

/// Values handlers read from configuration at request time.
#[derive(Clone, Debug)]
pub struct Settings {
    pub environment: Environment,
    pub frontend_url: String,
    pub cors_origins: Vec<String>,
    pub connect_country: String,
    pub currency: String,
    pub platform_fee_bps: i32,
    pub webhook_secret: Option<String>,
    pub rate_limit: RateLimitConfig,
}

#[derive(Clone)]
pub struct AppState {
    pub users: Arc<dyn UserRepository>,
    pub pilots: Arc<dyn PilotRepository>,
    pub flights: Arc<dyn FlightRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub admin: Arc<dyn AdminRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub catalog: Arc<dyn CatalogRepository>,
    pub payments: Arc<dyn PaymentGateway>,
    pub notifier: Arc<dyn Notifier>,
    pub rate_limiter: Arc<dyn RateLimiter>,
    pub booking_service: BookingService,
    pub auth: AuthConfig,
    pub settings: Settings,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        config: &Config,
        repos: Repositories,
        payments: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        rate_limiter: Arc<dyn RateLimiter>,
    ) -> Result<Self, prometheus::Error> {
        let booking_service = BookingService::new(
            repos.bookings.clone(),
            repos.flights.clone(),
            repos.pilots.clone(),
            payments.clone(),
            config.booking.currency.clone(),
        );

        Ok(Self {
            users: repos.users,
            pilots: repos.pilots,
            flights: repos.flights,
            bookings: repos.bookings,
            admin: repos.admin,
            notifications: repos.notifications,
            catalog: repos.catalog,
            payments,
            notifier,
            rate_limiter,
            booking_service,
            auth: AuthConfig {
                tokens: TokenKeys::new(&config.auth.jwt_secret, config.auth.jwt_expiration_seconds),
                admin_secret: config.auth.admin_secret.clone().filter(|s| !s.is_empty()),
            },
            settings: Settings {
                environment: config.server.environment,
                frontend_url: config.server.frontend_url.trim_end_matches('/').to_string(),
                cors_origins: config.server.cors_origins.clone(),
                connect_country: config.stripe.connect_country.clone(),
                currency: config.booking.currency.clone(),
                platform_fee_bps: config.booking.default_platform_fee_bps,
                webhook_secret: config.stripe.webhook_secret.clone().filter(|s| !s.is_empty()),
                rate_limit: config.rate_limit.clone(),
            },
            metrics: Metrics::new()?,
        })
    }
}
