//! Authenticator Core - Shared types, PIN encoding and credential storage
//!
//! This crate provides the pieces of the authentication overlay that do not
//! touch the display: account identifiers, the encoded PIN value, the
//! one-PIN-per-user credential store and the service configuration.

pub mod account;
pub mod config;
pub mod credentials;
pub mod error;
pub mod pin;

pub use account::{AccountUid, UserProfile};
pub use config::AuthenticatorConfig;
pub use credentials::{parse_credentials, CredentialStore, Credentials};
pub use error::{CoreError, Result};
pub use pin::{PinCode, PIN_LENGTH, PIN_SEPARATOR};
