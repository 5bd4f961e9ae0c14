pub mod client;
pub mod gateway;
pub mod prompts;
#[cfg(test)]
pub(crate) mod testing;

pub use client::*;
pub use gateway::*;
pub use prompts::*;
