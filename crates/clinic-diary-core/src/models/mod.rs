//! Domain models for the clinic diary.

mod appointment;
mod historical;
mod intent;
mod search;
mod timestamp;

pub use appointment::*;
pub use historical::*;
pub use intent::*;
pub use search::*;
pub use timestamp::*;
