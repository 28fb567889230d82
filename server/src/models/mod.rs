//! Data models for the demo write tables.

pub mod country;
pub mod state;

pub use country::Country;
pub use state::State;
