pub mod led;
pub mod lift;
