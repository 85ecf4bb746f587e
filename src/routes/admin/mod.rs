//! Back-office endpoints. Every handler takes the `Staff` extractor.

pub mod content;
pub mod customers;
pub mod enquiries;
pub mod insights;
pub mod orders;
pub mod products;
