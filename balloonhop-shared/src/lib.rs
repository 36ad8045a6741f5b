pub mod money;
pub mod pii;

pub use money::{Cents, FeeSplit};
pub use pii::Masked;
