//! # Weeknotes Core
//!
//! Library for the `weeknotes` weekly-notes generator.
//!
//! This crate provides:
//! - Secure credential storage (OS keyring behind a store trait)
//! - The Strava token lifecycle: cached record, refresh grant, and the
//!   one-time interactive authorization bootstrap
//! - Paginated activity retrieval with a bounded scan depth
//! - Weekly report aggregation, readings scraping, and note rendering
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use weeknotes_core::{ActivityClient, KeyringStore, TokenAuthority, config};
//!
//! async fn weekly_sentence() -> anyhow::Result<String> {
//!     let store = KeyringStore::new()?;
//!     let credentials = config::load_or_setup(&store).await?;
//!     let authority = TokenAuthority::new(store);
//!
//!     let token = authority.access_token(&credentials).await?;
//!     let activities = ActivityClient::new()
//!         .fetch_activities(token.expose(), None)
//!         .await?;
//!     Ok(weeknotes_core::WeeklyReport::from_activities(&activities).sentence())
//! }
//! ```

pub mod authority;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod note;
pub mod readings;
pub mod report;
pub mod store;
pub mod strava;
pub mod token;

// Re-export commonly used types at crate root
pub use authority::{StravaEndpoints, TokenAuthority};
pub use config::{Config, Credentials};
pub use error::WeeknotesError;
pub use note::{note_path, render, write_note};
pub use readings::{Reading, ReadingsError, fetch_recommendations};
pub use report::WeeklyReport;
pub use store::{CredentialKind, MemoryStore, Secret, SecretStore, StoreError};
pub use strava::{ACTIVITIES_PER_PAGE, ACTIVITIES_SCAN_MAX, Activity, ActivityClient, ApiError};
pub use token::{TokenError, TokenRecord};

#[cfg(feature = "keyring-store")]
pub use store::KeyringStore;
