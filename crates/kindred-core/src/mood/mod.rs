pub mod decay;
pub mod modulation;

pub use decay::MoodDecayEngine;
pub use modulation::{MoodModulation, describe, modulate};
