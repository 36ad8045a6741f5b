pub mod admin_repo;
pub mod app_config;
pub mod booking_repo;
pub mod catalog_repo;
pub mod database;
pub mod flight_repo;
pub mod memory;
pub mod notifier;
pub mod pilot_repo;
pub mod rate_limit;
pub mod redis_repo;
pub mod repositories;
mod rows;
pub mod stripe;
pub mod user_repo;

pub use app_config::Config;
pub use database::DbClient;
pub use memory::MemoryStore;
pub use notifier::LogNotifier;
pub use rate_limit::{MemoryRateLimiter, RateLimiter};
pub use redis_repo::RedisClient;
pub use repositories::Repositories;
pub use stripe::{DevGateway, StripeGateway};
