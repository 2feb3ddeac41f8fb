pub mod handlers;
pub mod partition;
pub mod service;
pub mod staleness;
pub mod store;

#[cfg(test)]
pub mod testing;
