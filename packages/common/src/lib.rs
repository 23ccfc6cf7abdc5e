pub mod block;
pub mod catalog;
pub mod contract;
pub mod error;
pub mod result;
pub mod store;

pub use block::*;
pub use catalog::*;
pub use contract::*;
pub use error::*;
pub use result::*;
pub use store::*;
