pub mod auth;
pub mod error;
pub mod models;
pub mod notify;
pub mod payment;
pub mod repository;
pub mod reservation;
pub mod validation;

pub use error::{AuthError, PaymentError, ReservationError, StoreError, StoreResult};
pub use reservation::{BookingError, BookingReceipt, BookingService};
pub use validation::{Checked, Now, ValidationErrors};
