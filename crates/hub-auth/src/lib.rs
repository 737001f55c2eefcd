//! Tag resolution (C1), the authorization guard (C7), and the opaque
//! session/token store (C9), grounded on `calimero-auth`'s `AuthService` /
//! `Storage` / `middleware` split.

pub mod credentials;
mod error;
pub mod guard;
pub mod sessions;
pub mod tags;

pub use credentials::{hash_secret, verify_secret};
pub use error::AuthError;
pub use guard::{AccessDecision, AuthorizationGuard, ResourceKind};
pub use sessions::{SessionIssue, SessionStore};
pub use tags::TagResolver;
