//! # MediTurnos API client
//!
//! Authenticated access to the MediTurnos backend: login and registration,
//! linked patients, medical histories, reviews, payments and express
//! appointments.
//!
//! ## Features
//!
//! - **Token Store**: access token and user profile persisted in a
//!   [`CredentialStorage`] (in memory or a JSON file on disk)
//! - **Per-request authorization**: each request decides for itself whether it
//!   carries `Authorization: Bearer <token>`
//! - **Session expiry**: any 401 outside `/login` clears the stored
//!   credentials and notifies a [`SessionObserver`]
//! - **Normalized errors**: every failure surfaces as [`ApiError`]
//! - **Query cache**: reads are cached per key with stale/gc windows and are
//!   invalidated by the mutations that affect them
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mt_client::{ClientConfig, MediTurnos, TokenStore, FileStorage};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let tokens = TokenStore::new(FileStorage::new("./data/session.json"));
//!     let client = MediTurnos::new(ClientConfig::new("https://api.mediturnos.com.ar"), tokens)?;
//!
//!     let profile = client.auth().login("ana@clinica.com", "secreto").await?;
//!     println!("Hola, {}", profile.display_name());
//!
//!     let reviews = client.reviews().for_professional("doc@clinica.com").await?;
//!     println!("{} reseñas", reviews.len());
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod request;
pub mod storage;
pub mod token_store;

pub use cache::{QueryCache, QueryKey, QueryOptions};
pub use client::MediTurnos;
pub use config::ClientConfig;
pub use error::{ApiError, ClientError, StorageError};
pub use http::{Authorization, HttpClient, LogSessionObserver, SessionObserver};
pub use request::{RequestDescriptor, Requester};
pub use storage::{CredentialStorage, FileStorage, MemoryStorage};
pub use token_store::TokenStore;

pub use mt_common::{Role, UserProfile};
