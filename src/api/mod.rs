pub mod admin;
pub mod orders;
pub mod payments;

pub use admin::*;
pub use orders::*;
pub use payments::*;
