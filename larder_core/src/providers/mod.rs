//! Provider adapters.
//!
//! Each adapter owns the raw response types for its provider and is the only
//! place those types are translated into [`crate::FoodRecord`]s.

pub mod local;
pub mod nutritionix;
pub mod open_food_facts;
pub mod usda;
