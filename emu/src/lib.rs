#[allow(clippy::cast_possible_truncation)]
#[allow(clippy::cast_sign_loss)]
#[allow(clippy::cast_possible_wrap)]
mod bitwise;

#[allow(clippy::cast_lossless)]
#[allow(clippy::unreadable_literal)]
pub mod bus;
pub mod compat;
pub mod config;
pub mod console;
pub mod cpu;

#[allow(clippy::cast_possible_truncation)]
pub mod state;
