pub mod auth;
pub mod timing;

pub use auth::AuthConfig;
