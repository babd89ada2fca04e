//! Background job aggregate.

mod model;

pub use model::{Job, JobStatus};
