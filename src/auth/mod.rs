pub mod backend;
pub mod credential_store;
pub mod scheduler;
pub mod token;

pub use backend::{AuthBackend, HttpAuthBackend};
pub use credential_store::{
    CredentialChange, CredentialKey, CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
pub use scheduler::{MIN_REFRESH_INTERVAL, REFRESH_BUFFER, SessionRefreshScheduler};
pub use token::{TokenClaims, TokenPair};
