pub mod types;
pub mod board;
pub mod rules;
pub mod state;

pub use types::*;
pub use board::*;
pub use rules::*;
pub use state::*;
