//! Client for a recipe-management HTTP service.
//!
//! `identity` owns the bearer-token session, `gateway` is the only path for
//! authorized calls, `recipes` wraps the service's endpoints, and `cli` is the
//! terminal front-end built on top of them.

pub mod cli;
pub mod config;
pub mod error;
pub mod gateway;
pub mod identity;
pub mod recipes;

pub use config::ClientConfig;
pub use error::{ClientError, ClientResult, Presentation};
pub use gateway::AuthenticatedGateway;
pub use identity::{Session, SessionEvent, SessionStore};
pub use recipes::{Recipe, RecipeApi, RecipeDraft, SearchCriteria};
