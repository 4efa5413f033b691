pub mod token_budget;

pub use token_budget::{MoodAllocation, TokenBudget, mood_aware_allocation};
