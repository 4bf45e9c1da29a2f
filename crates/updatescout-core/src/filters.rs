use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Every knob a filter set can turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FilterDimension {
    Product,
    Source,
    Status,
    Category,
    Tag,
    Wave,
    Month,
    AvailabilityType,
    EnabledFor,
    Geography,
    Language,
    Query,
    NewWithinDays,
    ChangedWithinDays,
    ReleasingWithinDays,
    DateRange,
    MinVersion,
    SortOrder,
    Horizon,
}

impl FilterDimension {
    /// Dimensions that hold a set of selected values, sources first since
    /// every other dimension's options depend on the active sources
    pub const MULTI_VALUED: [FilterDimension; 11] = [
        FilterDimension::Source,
        FilterDimension::Product,
        FilterDimension::Status,
        FilterDimension::Category,
        FilterDimension::Tag,
        FilterDimension::Wave,
        FilterDimension::Month,
        FilterDimension::AvailabilityType,
        FilterDimension::EnabledFor,
        FilterDimension::Geography,
        FilterDimension::Language,
    ];

    pub fn all() -> Vec<FilterDimension> {
        let mut dims = Self::MULTI_VALUED.to_vec();
        dims.extend([
            FilterDimension::Query,
            FilterDimension::NewWithinDays,
            FilterDimension::ChangedWithinDays,
            FilterDimension::ReleasingWithinDays,
            FilterDimension::DateRange,
            FilterDimension::MinVersion,
            FilterDimension::SortOrder,
            FilterDimension::Horizon,
        ]);
        dims
    }

    pub fn is_multi_valued(&self) -> bool {
        Self::MULTI_VALUED.contains(self)
    }

    pub fn label(&self) -> &'static str {
        match self {
            FilterDimension::Product => "Product",
            FilterDimension::Source => "Source",
            FilterDimension::Status => "Status",
            FilterDimension::Category => "Category",
            FilterDimension::Tag => "Tag",
            FilterDimension::Wave => "Release wave",
            FilterDimension::Month => "Month",
            FilterDimension::AvailabilityType => "Availability type",
            FilterDimension::EnabledFor => "Enabled for",
            FilterDimension::Geography => "Geography",
            FilterDimension::Language => "Language",
            FilterDimension::Query => "Search",
            FilterDimension::NewWithinDays => "New within",
            FilterDimension::ChangedWithinDays => "Changed within",
            FilterDimension::ReleasingWithinDays => "Releasing within",
            FilterDimension::DateRange => "Date range",
            FilterDimension::MinVersion => "Minimum version",
            FilterDimension::SortOrder => "Sort order",
            FilterDimension::Horizon => "Horizon",
        }
    }
}

impl std::fmt::Display for FilterDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Release date ordering
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Newest,
    Oldest,
}

/// A complete filter selection, as persisted for the global view or a customer
///
/// Every field is defaulted so older or partial payloads still load. An empty
/// list means the dimension applies no restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterSet {
    pub products: Vec<String>,
    pub sources: Vec<String>,
    pub statuses: Vec<String>,
    pub categories: Vec<String>,
    pub tags: Vec<String>,
    pub waves: Vec<String>,
    pub months: Vec<String>,
    pub availability_types: Vec<String>,
    pub enabled_for: Vec<String>,
    pub geographies: Vec<String>,
    pub languages: Vec<String>,

    pub query: String,
    /// Released within the last N days (0 = off)
    pub new_within_days: u32,
    /// Updated within the last N days (0 = off)
    pub changed_within_days: u32,
    /// Releasing within the next N days (0 = off)
    pub releasing_within_days: u32,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub min_version: Option<u32>,
    pub sort_order: SortOrder,
    pub horizon_months: Option<u32>,
    pub history_months: Option<u32>,

    // Audience targeting, never applied to items
    pub target_customer_ids: Vec<String>,
    pub target_group_ids: Vec<String>,
    pub target_owner_tags: Vec<String>,
}

impl FilterSet {
    /// Selected values for a multi-valued dimension
    pub fn selection(&self, dimension: FilterDimension) -> Option<&Vec<String>> {
        let values = match dimension {
            FilterDimension::Product => &self.products,
            FilterDimension::Source => &self.sources,
            FilterDimension::Status => &self.statuses,
            FilterDimension::Category => &self.categories,
            FilterDimension::Tag => &self.tags,
            FilterDimension::Wave => &self.waves,
            FilterDimension::Month => &self.months,
            FilterDimension::AvailabilityType => &self.availability_types,
            FilterDimension::EnabledFor => &self.enabled_for,
            FilterDimension::Geography => &self.geographies,
            FilterDimension::Language => &self.languages,
            _ => return None,
        };
        Some(values)
    }

    pub fn selection_mut(&mut self, dimension: FilterDimension) -> Option<&mut Vec<String>> {
        let values = match dimension {
            FilterDimension::Product => &mut self.products,
            FilterDimension::Source => &mut self.sources,
            FilterDimension::Status => &mut self.statuses,
            FilterDimension::Category => &mut self.categories,
            FilterDimension::Tag => &mut self.tags,
            FilterDimension::Wave => &mut self.waves,
            FilterDimension::Month => &mut self.months,
            FilterDimension::AvailabilityType => &mut self.availability_types,
            FilterDimension::EnabledFor => &mut self.enabled_for,
            FilterDimension::Geography => &mut self.geographies,
            FilterDimension::Language => &mut self.languages,
            _ => return None,
        };
        Some(values)
    }

    pub fn has_targeting(&self) -> bool {
        !self.target_customer_ids.is_empty()
            || !self.target_group_ids.is_empty()
            || !self.target_owner_tags.is_empty()
    }

    /// Copy with the audience fields cleared, ready for item filtering
    pub fn without_targeting(&self) -> FilterSet {
        FilterSet {
            target_customer_ids: Vec::new(),
            target_group_ids: Vec::new(),
            target_owner_tags: Vec::new(),
            ..self.clone()
        }
    }

    /// Whether a scalar dimension is switched on
    pub fn is_scalar_active(&self, dimension: FilterDimension) -> bool {
        match dimension {
            FilterDimension::Query => !self.query.trim().is_empty(),
            FilterDimension::NewWithinDays => self.new_within_days > 0,
            FilterDimension::ChangedWithinDays => self.changed_within_days > 0,
            FilterDimension::ReleasingWithinDays => self.releasing_within_days > 0,
            FilterDimension::DateRange => self.date_from.is_some() || self.date_to.is_some(),
            FilterDimension::MinVersion => self.min_version.is_some(),
            FilterDimension::Horizon => {
                self.horizon_months.is_some() || self.history_months.is_some()
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_payload_loads() {
        let filters: FilterSet =
            serde_json::from_str(r#"{"sources":["release-plan"],"minVersion":22}"#).unwrap();
        assert_eq!(filters.sources, vec!["release-plan".to_string()]);
        assert_eq!(filters.min_version, Some(22));
        assert_eq!(filters.sort_order, SortOrder::Newest);
        assert!(filters.products.is_empty());
    }

    #[test]
    fn test_round_trip_keeps_selection_order() {
        let filters = FilterSet {
            products: vec!["Sales".into(), "Finance".into(), "Commerce".into()],
            date_from: NaiveDate::from_ymd_opt(2025, 1, 1),
            ..Default::default()
        };
        let json = serde_json::to_string(&filters).unwrap();
        let back: FilterSet = serde_json::from_str(&json).unwrap();
        assert_eq!(back, filters);
    }

    #[test]
    fn test_without_targeting() {
        let filters = FilterSet {
            tags: vec!["AI".into()],
            target_customer_ids: vec!["c-1".into()],
            target_owner_tags: vec!["emea".into()],
            ..Default::default()
        };
        assert!(filters.has_targeting());

        let stripped = filters.without_targeting();
        assert!(!stripped.has_targeting());
        assert_eq!(stripped.tags, filters.tags);
    }

    #[test]
    fn test_selection_only_for_multi_valued() {
        let filters = FilterSet::default();
        for dim in FilterDimension::all() {
            assert_eq!(filters.selection(dim).is_some(), dim.is_multi_valued());
        }
    }
}
