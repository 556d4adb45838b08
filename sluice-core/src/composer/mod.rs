mod branch;
mod otherwise;
pub mod pipeline;

pub use self::branch::BranchBuilder;
pub use self::otherwise::OtherwiseBuilder;
pub use self::pipeline::{Pipeline, RunSummary};
