//! Request handlers.

pub mod agents;
pub mod assets;
pub mod health;
pub mod profile;
pub mod uploads;

pub use agents::*;
pub use assets::*;
pub use health::*;
pub use profile::*;
pub use uploads::*;
