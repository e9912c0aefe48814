mod connector;
mod legacy;

pub use connector::*;
pub use legacy::*;
