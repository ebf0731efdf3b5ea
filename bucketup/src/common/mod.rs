mod constants;
mod shared;
mod validation;

pub use constants::*;
pub use shared::*;
pub(crate) use validation::*;
