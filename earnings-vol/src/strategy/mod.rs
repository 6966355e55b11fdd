//! Option structures.
//!
//! - [`OptionLeg`] and [`Strategy`] hold entry economics and Greeks
//! - [`StrategyKind`] is the closed catalog, built via [`StructureBuilder`]
//! - [`classify`] decides defined vs. undefined risk

pub mod catalog;
pub mod leg;
pub mod risk;

pub use catalog::{StrategyKind, StructureBuilder};
pub use leg::{NetGreeks, OptionLeg, Strategy};
pub use risk::{classify, Coverage, RiskAssessment, RiskClass};
