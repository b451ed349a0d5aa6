//! Session ownership for the recipe client: the bearer credential, who it
//! belongs to, and the advisory role set decoded from it.
//! Keep the public surface thin and split implementation across sub-modules.

mod claims;
mod session;
mod storage;

pub use claims::{decode_claims, derive_roles, fallback_roles, TokenClaims, ROLE_ADMIN, ROLE_USER};
pub use session::{Session, SessionEvent, SessionStore, SessionToken, LOGIN_PATH};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, ROLES_KEY, TOKEN_KEY, USERNAME_KEY};
