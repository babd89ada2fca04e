//! Revocable session store.

mod store;

pub use store::{LoadedSession, RefreshMaxAgeResolver, SessionStore, session_checksum};
