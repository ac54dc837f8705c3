#![allow(unreachable_pub)]

mod error;
mod fields;
mod lookup;

pub use error::ErrorKind;
pub use fields::{Field, Fields};
pub use lookup::{LookupResult, STATUS_FAIL, STATUS_SUCCESS};

/// The ipapi `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
