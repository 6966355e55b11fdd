//! Market data: quote and chain types, trading calendar, filters,
//! parquet loading and synthetic generation.

pub mod calendar;
pub mod filters;
pub mod loader;
pub mod synthetic;
pub mod types;

pub use filters::{filter_by_liquidity, filter_by_moneyness, filter_chain, filter_term_structure};
pub use loader::{select_term_structure, ChainLoader, LoaderError};
pub use synthetic::{generate_data_set, SyntheticDataSet, SyntheticScenario};
pub use types::{OptionQuote, OptionType, OptionsChain, OptionsSnapshot, PriceBar, Side, TermStructure};
