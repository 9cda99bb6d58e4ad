pub(crate) mod dropout;
pub mod error;

pub use error::KoBertError;
