#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Display and keypad front ends that need no device: a 16x2 character
//! buffer plus terminal-backed display and keypad.

pub mod console;
pub mod error;
pub mod lcd;

pub use console::{ConsoleDisplay, ConsoleKeypad};
pub use error::UiError;
pub use lcd::LcdBuffer;
