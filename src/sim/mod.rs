pub mod blocks;
pub mod contact;
pub mod event;
pub mod level;
pub mod player;
pub mod session;
pub mod step;
pub mod world;
