pub mod config;
pub mod grid;
pub mod layer;
pub mod oracle;

pub use config::Config;
pub use grid::{build_grid, GridError, GridPoint};
pub use layer::{Layer, LayerParams};
pub use oracle::{DuplicateOracle, NeverDuplicate};
