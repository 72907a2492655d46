//! World-anchor bookkeeping and the durable anchor table

mod manager;
mod store;

pub use manager::AnchorManager;
pub use store::{AnchorTable, AnchorTableStore, DEFAULT_TABLE_FILE};
