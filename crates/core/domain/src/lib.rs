pub mod data;
pub mod route;

pub use data::{Envelope, Reading};
pub use route::ChannelTable;
