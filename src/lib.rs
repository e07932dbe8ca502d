//! Filter-driven aggregation pipeline for the commercial dashboard: typed
//! filter sets decoded from the navigable address, per-domain fetchers that
//! push predicates down to Postgres, and pure reducers that turn row sets
//! into the KPI, group-by and funnel view models every page consumes.

pub mod aggregate;
pub mod db;
pub mod filters;
pub mod models;
pub mod options;
pub mod report;
pub mod view;
