//! Authentication for the Evently API.
//!
//! - [`token`]: HS256 bearer tokens carrying a user id and email
//! - [`resolver`]: cache-aside lookup of the authenticated principal
//! - [`middleware`]: the per-request authentication gate and the
//!   [`CurrentUser`](middleware::CurrentUser) extractor
//! - [`password`]: Argon2id password hashing

pub mod config;
pub mod error;
pub mod middleware;
pub mod password;
pub mod resolver;
pub mod token;

pub use config::{AuthConfig, Posture};
pub use error::AuthError;
pub use middleware::{AuthState, AuthenticatedUser, CurrentUser, authenticate};
pub use resolver::PrincipalResolver;
pub use token::{Claims, JwtError, TokenService, VerifiedToken};
