/// Side-scrolling platformer simulation.
///
/// `domain` holds the static rules (tiles, collision, entity behaviour),
/// `sim` drives a level tick by tick and tracks the session around it.
/// The terminal frontend lives in the binary.

pub mod config;
pub mod domain;
pub mod sim;
