//! # lightbase-worker
//!
//! Background job worker pool. Jobs are enqueued on the transaction of the
//! request that produced them (see `JobRepository::enqueue`); the runner
//! here claims them with `FOR UPDATE SKIP LOCKED` and dispatches to
//! registered handlers.
//!
//! Event jobs (`auth.*`) without a registered handler are completed
//! untouched: mail and push delivery are external collaborators that
//! register their own handlers when embedded.

pub mod jobs;
pub mod runner;

pub use runner::{JobHandler, JobRunner};
