#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Non-spatial joins between region collections and tabular data.
//!
//! Regions are matched to table rows by name after normalizing both sides.
//! Joins are left joins: every region survives, and regions without a
//! matching row get a documented default (0 for numbers, an empty list
//! for career lists). Nothing in here fails on a miss.

pub mod careers;
pub mod join;
pub mod normalize;
pub mod period;
pub mod population;

pub use careers::{CareerCatalog, FacultyTree};
pub use join::{join_lists, join_numeric};
pub use normalize::normalize_key;
pub use period::{PeriodRules, known_periods, select_period};
pub use population::PopulationTable;
