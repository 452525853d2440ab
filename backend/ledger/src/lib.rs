//! # Ledger
//!
//! Shared records and JSON payloads for the eco points backend.
//!
//! Both the server and the smoke tester depend on this crate so the wire
//! shapes only live in one place.
//!
//! ## Tables
//! - `profiles`: one row per user, `id` (**string**) and `points` (**int**, may be null)
//! - `eco_actions`: one row per logged action, references `profiles.id` through `user_id`

pub mod models;
pub mod payloads;

pub use models::{EcoAction, ImpactRow, ImpactTotals, NewEcoAction, Profile, RowId};
