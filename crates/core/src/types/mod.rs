//! Core types for the meal plan service.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod label;
pub mod meal_plan;
pub mod username;

pub use id::*;
pub use label::{LabelError, label_matches, normalize_labels};
pub use meal_plan::{MealPlan, MealPlanPatch, NewMealPlan, ValidationError, zero_time};
pub use username::{Username, UsernameError};
