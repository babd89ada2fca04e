//! Session aggregate: session record, token chain, bound device.

mod device;
mod model;
mod token;

pub use device::{Device, DeviceInput, DevicePlatform};
pub use model::{Session, SessionData, SessionType, TwoStepType};
pub use token::{SessionToken, TokenPair};
