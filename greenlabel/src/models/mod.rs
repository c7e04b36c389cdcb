mod decode;
mod product;
mod search;
mod verification;

pub use decode::*;
pub use product::*;
pub use search::*;
pub use verification::*;
