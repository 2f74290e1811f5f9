use thiserror::Error;

/// Fatal configuration problems. These are raised once, when a grid or engine is built,
/// and never while a step is running.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("lattice must have at least one column and one row, got {cols}x{rows}")]
    EmptyLattice { cols: i32, rows: i32 },

    #[error("unsupported velocity width {0}: only 2- and 3-component vectors are allowed")]
    UnsupportedVectorWidth(usize),

    #[error("invalid simulation parameter `{name}` = {value}")]
    InvalidParameter { name: &'static str, value: f32 },
}

/// A rejected interactive edit. The grid is left untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EditError {
    #[error("tile ({col}, {row}) is outside the {cols}x{rows} pressure grid")]
    OutOfRange {
        col: i32,
        row: i32,
        cols: i32,
        rows: i32,
    },

    #[error("lattice point ({col}, {row}) is not a valid velocity location")]
    InvalidCorner { col: i32, row: i32 },

    #[error("velocity has {found} components, this lattice stores {expected}")]
    WidthMismatch { expected: usize, found: usize },

    #[error("refusing to write a non-finite value at ({col}, {row})")]
    NonFinite { col: i32, row: i32 },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RunnerError {
    #[error("simulation thread is no longer running")]
    Disconnected,
}
