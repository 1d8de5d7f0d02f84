pub mod arena;
pub mod bot;
pub mod game;
pub mod movegen;
pub mod threat;
pub mod web;

pub use arena::*;
pub use bot::*;
pub use game::*;
pub use movegen::*;
pub use threat::*;
