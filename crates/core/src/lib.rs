//! PeopleOS core types and utilities
//!
//! Settings loading, session token storage and tracing setup shared by the
//! API client and the command-line front end.

pub mod config;
pub mod error;
pub mod session;
pub mod tracing;

pub use config::{ApiSettings, SessionSettings, Settings};
pub use error::{CoreError, CoreResult, ErrorContext};
pub use session::{FileTokenStore, MemoryTokenStore, TokenStore};
