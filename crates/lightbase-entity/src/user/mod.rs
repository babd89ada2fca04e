//! User aggregate.

mod model;

pub use model::{User, UserWithLogins};
