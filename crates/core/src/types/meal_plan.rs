//! Meal plan record and its create/patch inputs.
//!
//! Wire format is camelCase JSON with RFC 3339 timestamps:
//!
//! ```json
//! {
//!   "id": "7c9e6679-7425-40de-944b-e07fc1f90ae7",
//!   "customer": "Ana",
//!   "diet": "vegan",
//!   "contactNumber": "+1 555 0100",
//!   "allergies": ["peanut"],
//!   "avoidedIngredients": ["cilantro"],
//!   "deliveryMonday": "2026-10-19T09:00:00Z",
//!   "deliveryTuesday": "0001-01-01T00:00:00Z",
//!   "tags": ["vegan"],
//!   "createdAt": "2026-10-16T12:00:00.123456Z"
//! }
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::MealPlanId;
use super::label::{LabelError, normalize_labels};

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch.
const ZERO_TIME_UNIX_SECONDS: i64 = -62_135_596_800;

/// The timestamp used for delivery slots the client did not set
/// (`0001-01-01T00:00:00Z`).
#[must_use]
pub fn zero_time() -> DateTime<Utc> {
    DateTime::from_timestamp(ZERO_TIME_UNIX_SECONDS, 0).unwrap_or_default()
}

/// Errors raised when a create or patch payload is rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// `customer` is missing or blank.
    #[error("customer is required")]
    MissingCustomer,

    /// A label set contains an invalid entry.
    #[error(transparent)]
    Label(#[from] LabelError),

    /// A patch carried no fields to change.
    #[error("patch must contain at least one field")]
    EmptyPatch,
}

/// A stored meal plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlan {
    pub id: MealPlanId,
    pub customer: String,
    pub diet: String,
    pub contact_number: String,
    pub allergies: Vec<String>,
    pub avoided_ingredients: Vec<String>,
    pub delivery_monday: DateTime<Utc>,
    pub delivery_tuesday: DateTime<Utc>,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl MealPlan {
    /// Whether any tag equals `tag`, ignoring case.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| super::label::label_matches(t, tag))
    }

    /// Apply a validated patch. `id` and `created_at` are never touched.
    pub fn apply(&mut self, patch: MealPlanPatch) {
        if let Some(customer) = patch.customer {
            self.customer = customer;
        }
        if let Some(diet) = patch.diet {
            self.diet = diet;
        }
        if let Some(contact_number) = patch.contact_number {
            self.contact_number = contact_number;
        }
        if let Some(allergies) = patch.allergies {
            self.allergies = allergies;
        }
        if let Some(avoided) = patch.avoided_ingredients {
            self.avoided_ingredients = avoided;
        }
        if let Some(monday) = patch.delivery_monday {
            self.delivery_monday = monday;
        }
        if let Some(tuesday) = patch.delivery_tuesday {
            self.delivery_tuesday = tuesday;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
    }
}

/// Client payload for creating a meal plan.
///
/// Any `id` or `createdAt` in the payload is ignored; both are assigned
/// server-side.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMealPlan {
    #[serde(default)]
    pub customer: String,
    #[serde(default)]
    pub diet: String,
    #[serde(default)]
    pub contact_number: String,
    #[serde(default)]
    pub allergies: Vec<String>,
    #[serde(default)]
    pub avoided_ingredients: Vec<String>,
    #[serde(default = "zero_time")]
    pub delivery_monday: DateTime<Utc>,
    #[serde(default = "zero_time")]
    pub delivery_tuesday: DateTime<Utc>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl NewMealPlan {
    /// Validate and normalize the payload into a record with the given
    /// identity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::MissingCustomer` for a blank customer and
    /// `ValidationError::Label` for blank labels.
    pub fn into_meal_plan(
        self,
        id: MealPlanId,
        created_at: DateTime<Utc>,
    ) -> Result<MealPlan, ValidationError> {
        let customer = self.customer.trim();
        if customer.is_empty() {
            return Err(ValidationError::MissingCustomer);
        }

        Ok(MealPlan {
            id,
            customer: customer.to_owned(),
            diet: self.diet.trim().to_owned(),
            contact_number: self.contact_number.trim().to_owned(),
            allergies: normalize_labels("allergies", self.allergies)?,
            avoided_ingredients: normalize_labels("avoidedIngredients", self.avoided_ingredients)?,
            delivery_monday: self.delivery_monday,
            delivery_tuesday: self.delivery_tuesday,
            tags: normalize_labels("tags", self.tags)?,
            created_at,
        })
    }
}

/// Partial update for a meal plan. Absent fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MealPlanPatch {
    pub customer: Option<String>,
    pub diet: Option<String>,
    pub contact_number: Option<String>,
    pub allergies: Option<Vec<String>>,
    pub avoided_ingredients: Option<Vec<String>>,
    pub delivery_monday: Option<DateTime<Utc>>,
    pub delivery_tuesday: Option<DateTime<Utc>>,
    pub tags: Option<Vec<String>>,
}

impl MealPlanPatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.customer.is_none()
            && self.diet.is_none()
            && self.contact_number.is_none()
            && self.allergies.is_none()
            && self.avoided_ingredients.is_none()
            && self.delivery_monday.is_none()
            && self.delivery_tuesday.is_none()
            && self.tags.is_none()
    }

    /// Validate and normalize the patch with the same rules as creation.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyPatch` when no field is present,
    /// `ValidationError::MissingCustomer` for a blank customer, and
    /// `ValidationError::Label` for blank labels.
    pub fn validate(self) -> Result<Self, ValidationError> {
        if self.is_empty() {
            return Err(ValidationError::EmptyPatch);
        }

        let customer = match self.customer {
            Some(c) => {
                let trimmed = c.trim();
                if trimmed.is_empty() {
                    return Err(ValidationError::MissingCustomer);
                }
                Some(trimmed.to_owned())
            }
            None => None,
        };

        Ok(Self {
            customer,
            diet: self.diet.map(|d| d.trim().to_owned()),
            contact_number: self.contact_number.map(|c| c.trim().to_owned()),
            allergies: self
                .allergies
                .map(|a| normalize_labels("allergies", a))
                .transpose()?,
            avoided_ingredients: self
                .avoided_ingredients
                .map(|a| normalize_labels("avoidedIngredients", a))
                .transpose()?,
            delivery_monday: self.delivery_monday,
            delivery_tuesday: self.delivery_tuesday,
            tags: self.tags.map(|t| normalize_labels("tags", t)).transpose()?,
        })
    }
}
