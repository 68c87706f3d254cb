pub mod config;
pub mod models;
pub mod pipeline;

#[cfg(test)]
mod test_support;
