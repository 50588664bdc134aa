//! walletlogin: sign in to an OIDC authorization endpoint with a crypto
//! wallet.
//!
//! The login page link carries a one-time `nonce`. The wallet signs a
//! message binding the selected account to that nonce, and the signed proof
//! is appended to the original query and handed to the authorization
//! endpoint, which verifies it and issues the session.

pub mod bootstrap;
pub mod cli;
pub mod config;
pub mod error;
pub mod handshake;
pub mod navigator;
pub mod settings;
pub mod wallet;

pub use config::Config;
pub use error::{Error, Result};
