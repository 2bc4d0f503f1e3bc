pub mod directions;
pub mod health;
