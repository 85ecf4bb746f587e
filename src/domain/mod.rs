//! Storefront domain model: pure business rules, no I/O.
pub mod aggregates;
pub mod catalog;
pub mod events;
pub mod insights;
pub mod pricing;
pub mod value_objects;
