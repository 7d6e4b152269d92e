pub mod domain;
pub mod rollup;

pub use domain::{Building, Campus, Reading};
pub use rollup::BucketTotal;
