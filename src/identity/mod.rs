//! Identity, session and access-control core.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod credentials;
mod session;
mod provider;
mod authorizer;

pub use principal::{Principal, Role};
pub use credentials::CredentialStore;
pub use session::{Session, SessionToken, SessionManager};
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest};
pub use authorizer::{authorize, explain, Action, Decision, Ownership, ResourceKind};
