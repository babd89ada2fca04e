//! Role and permission aggregate.

mod model;

pub use model::{Permission, Role, RolePermission, UserRole};
