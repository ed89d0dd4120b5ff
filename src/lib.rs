pub mod aggregate;
pub mod auth;
pub mod domain;
pub mod paths;
pub mod session;
pub mod storage;
pub mod store;
pub mod validator;

pub use auth::{AuthError, AuthProvider, UserSession};
pub use domain::{Project, TimeEntry};
pub use session::{TrackError, Tracker};
pub use storage::JsonStore;
pub use store::{EntryStore, StoreError};
