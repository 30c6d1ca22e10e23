pub mod assumptions;
pub mod benchmarks;
pub mod error;
pub mod stats;
pub mod traits;
pub mod types;

pub use assumptions::*;
pub use benchmarks::*;
pub use error::*;
pub use traits::*;
pub use types::*;
