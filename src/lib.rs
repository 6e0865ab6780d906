//! Client for the community gear catalog API.
//!
//! The [`session::SessionStore`] owns the logged-in identity and its
//! persisted mirror; the [`catalog::Catalog`] performs catalog calls and holds
//! the view state. Anything that needs authorization takes the session as an
//! explicit argument.

pub mod api;
pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod permissions;
pub mod session;
pub mod state;
pub mod view;

pub use error::{CatalogError, Result};
