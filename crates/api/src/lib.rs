//! `fablab-api`: JSON-over-HTTP surface of the inventory ledger.

pub mod app;
pub mod authz;
pub mod context;
pub mod middleware;
