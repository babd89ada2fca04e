//! Tenant aggregate.

mod model;

pub use model::{Tenant, UserTenant};
