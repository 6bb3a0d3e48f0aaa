//! Tenant directory storage: companies, workspaces, users, custom roles, and
//! password reset tokens.

pub mod in_memory;
pub mod postgres;
pub mod store;

pub use in_memory::InMemoryDirectory;
pub use postgres::PostgresDirectory;
pub use store::{CompanyAttach, Directory, RoleDeletion, StoreError, UniqueKey};
