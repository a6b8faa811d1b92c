//! Jeepney Transit Core Library
//!
//! Domain rules shared by the backend and its clients:
//! - Routes are fixed, ordered lists of named checkpoints
//! - Fares are looked up by exact, directed checkpoint pair
//! - Form validation rules are the same on every side of the wire

pub mod discount;
pub mod error;
pub mod fare;
pub mod route;
pub mod trip;
pub mod user;
pub mod validation;

pub use discount::{discounted_fare, DiscountCategory, DISCOUNT_RATE};
pub use error::Error;
pub use fare::{FareSegment, FareTable};
pub use route::Route;
pub use trip::TripLog;
pub use user::{ApplicationStatus, Role, VerificationStatus};
pub use validation::ValidationErrors;

/// Result type for transit-core operations
pub type Result<T> = std::result::Result<T, Error>;
