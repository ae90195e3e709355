//! Queries over the shared Pombola database
//!
//! Every function takes a `&mut SqliteConnection` so it can run inside the
//! run-wide transaction and the per-race savepoints.

pub mod organisations;
pub mod people;
pub mod places;
pub mod positions;
pub mod runs;
