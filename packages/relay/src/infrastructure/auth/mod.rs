//! AuthProvider implementations.
//!
//! Production deployments implement [`crate::domain::AuthProvider`] against
//! the CMS user/permission tables; the open provider here backs the
//! standalone binary, where the relay runs without a CMS.

mod open;

pub use open::OpenAuthProvider;
