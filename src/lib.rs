#[macro_use]
extern crate tracing;

pub mod animation;
pub mod cli;
pub mod headless;
pub mod movement;
pub mod reactive;
pub mod sheet;
pub mod snap;
pub mod speculation;
pub mod trace;
pub mod transition;
pub mod utils;

#[cfg(test)]
mod tests;
