//! Creates the CRM tables a database is missing, in foreign key order, and
//! loads seed rows that are skipped when they are already present.

pub mod libs;

pub use libs::*;
