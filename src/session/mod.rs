pub mod store;
pub mod hub;

pub use store::*;
pub use hub::*;
