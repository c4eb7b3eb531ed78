//! Data category taxonomy.
//!
//! Every cached query is tagged with exactly one `DataCategory`. The tag is
//! part of the query key and lets invalidation be scoped to one kind of
//! entity (e.g. all meal details after an edit) instead of the whole cache.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown data category: {0}")]
pub struct UnknownCategory(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataCategory {
    MealsList,
    MealDetails,
    PlansList,
    PlanDetails,
    IngredientsList,
    UserDetails,
    UserPreferences,
    UserContext,
    Meal,
}

impl DataCategory {
    /// The closed set of categories, in declaration order.
    pub const ALL: [DataCategory; 9] = [
        DataCategory::MealsList,
        DataCategory::MealDetails,
        DataCategory::PlansList,
        DataCategory::PlanDetails,
        DataCategory::IngredientsList,
        DataCategory::UserDetails,
        DataCategory::UserPreferences,
        DataCategory::UserContext,
        DataCategory::Meal,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataCategory::MealsList => "meals-list",
            DataCategory::MealDetails => "meal-details",
            DataCategory::PlansList => "plans-list",
            DataCategory::PlanDetails => "plan-details",
            DataCategory::IngredientsList => "ingredients-list",
            DataCategory::UserDetails => "user-details",
            DataCategory::UserPreferences => "user-preferences",
            DataCategory::UserContext => "user-context",
            DataCategory::Meal => "meal",
        }
    }

    /// List categories ignore entity ids when building keys.
    pub fn is_list(&self) -> bool {
        matches!(
            self,
            DataCategory::MealsList | DataCategory::PlansList | DataCategory::IngredientsList
        )
    }

    /// Categories whose cached data depends on this one.
    ///
    /// Cascades are one level deep: the related categories' own relations
    /// are not followed.
    pub fn related(&self) -> &'static [DataCategory] {
        match self {
            DataCategory::Meal => &[DataCategory::MealsList, DataCategory::MealDetails],
            DataCategory::MealDetails => &[DataCategory::MealsList],
            DataCategory::PlanDetails => &[DataCategory::PlansList],
            DataCategory::UserDetails => &[DataCategory::UserPreferences, DataCategory::UserContext],
            DataCategory::UserPreferences => &[DataCategory::UserContext],
            DataCategory::MealsList
            | DataCategory::PlansList
            | DataCategory::IngredientsList
            | DataCategory::UserContext => &[],
        }
    }
}

impl fmt::Display for DataCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataCategory {
    type Err = UnknownCategory;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DataCategory::ALL
            .iter()
            .copied()
            .find(|category| category.as_str() == s)
            .ok_or_else(|| UnknownCategory(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_tags_are_distinct() {
        let tags: HashSet<&str> = DataCategory::ALL.iter().map(|c| c.as_str()).collect();
        assert_eq!(tags.len(), DataCategory::ALL.len());
    }

    #[test]
    fn test_parse_known_and_unknown() {
        assert_eq!("meal-details".parse::<DataCategory>(), Ok(DataCategory::MealDetails));
        assert_eq!("meal".parse::<DataCategory>(), Ok(DataCategory::Meal));
        assert_eq!(
            "progress".parse::<DataCategory>(),
            Err(UnknownCategory("progress".to_string()))
        );
    }

    #[test]
    fn test_serde_uses_tag() {
        let json = serde_json::to_string(&DataCategory::UserPreferences).unwrap();
        assert_eq!(json, "\"user-preferences\"");
        let parsed: DataCategory = serde_json::from_str("\"ingredients-list\"").unwrap();
        assert_eq!(parsed, DataCategory::IngredientsList);
    }

    #[test]
    fn test_related_never_contains_self() {
        for category in DataCategory::ALL {
            assert!(!category.related().contains(&category), "{category}");
        }
    }

    #[test]
    fn test_list_categories() {
        let lists: Vec<_> = DataCategory::ALL.iter().filter(|c| c.is_list()).collect();
        assert_eq!(lists.len(), 3);
        assert!(!DataCategory::Meal.is_list());
    }
}
