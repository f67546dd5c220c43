//! Store of record: SQLite-backed persistence for users, scans, the
//! reputation blacklist, guardian links, and guardian alerts.

mod schema;
mod store;
mod types;

pub use schema::{get_schema_version, initialize_schema, is_initialized, SCHEMA_VERSION};
pub use store::SqliteStore;
pub use types::{
    AlertAction, AlertStatus, BlacklistEntry, BlacklistSource, EntityKind, GuardianAlert,
    GuardianLink, NewBlacklistEntry, NewScan, NewUser, Scan, TrustedSender, User, UserSettings,
};
