pub mod base;
pub mod configs;
pub mod factory;
pub mod openai;
pub mod utils;

#[cfg(any(test, feature = "testing"))]
pub mod mock;
