pub mod contracts;

// Only with the `http` feature
#[cfg(feature = "http")]
pub mod client;
