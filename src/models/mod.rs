pub mod extraction;
mod lenient;
pub mod meeting;
pub mod protocol;
pub mod transcript;

pub use extraction::*;
pub use meeting::*;
pub use protocol::*;
pub use transcript::*;
