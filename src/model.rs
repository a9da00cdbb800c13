//! Core data model for uplink.
//!
//! Missions name and timestamp a collection session; products describe
//! what each collected file is.

mod mission;
mod product;

pub use mission::{Mission, MissionError, START_TIME_FORMAT, parse_start_time, sanitize_name};
pub use product::{
    ImageSubtype, InvalidProduct, Product, ProductKind, ProductType, TacticalSubtype,
};
