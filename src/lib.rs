pub mod config;
pub mod error;
pub mod identity;
pub mod server;
pub mod storage;

pub use error::{AuthError, AuthResult};
