//! hackportal: authenticated HTTP client for the hackathon portal.
//!
//! Every request goes through [`http::AuthClient`], which attaches the stored
//! access credential and, when the backend answers 401, performs a single
//! coordinated refresh shared by all concurrently failing requests before
//! replaying each of them once.
//!
//! # Quick Start
//!
//! ```no_run
//! use hackportal::prelude::*;
//!
//! # async fn example() -> hackportal::error::Result<()> {
//! let client = AuthClient::from_config(ClientConfig::from_env()?)?;
//! client.sign_in("student@example.org", "correct horse").await?;
//! let team: serde_json::Value = client.get_json("/teams/mine").await?;
//! println!("{team}");
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod config;
pub mod error;
pub mod http;
pub mod prelude;

#[cfg(feature = "cli")]
pub mod cli;
