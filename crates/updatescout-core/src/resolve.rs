// Effective filter resolution
//
// The global filter set is the baseline. A customer either inherits it or
// owns a custom set; either way the result goes through the same
// normalization before anything is filtered.
use crate::filters::FilterSet;
use crate::normalize::Normalizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::info;

/// Whether a customer follows the global filters or keeps its own
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterMode {
    #[default]
    Inherit,
    Custom,
}

/// Persisted filter state: the global set plus per-customer modes and overrides
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FilterState {
    pub global: Option<FilterSet>,
    pub customer_filters: HashMap<String, FilterSet>,
    pub modes: HashMap<String, FilterMode>,
}

impl FilterState {
    pub fn mode(&self, customer_id: &str) -> FilterMode {
        self.modes.get(customer_id).copied().unwrap_or_default()
    }

    pub fn set_global(&mut self, filters: FilterSet) {
        self.global = Some(filters);
    }

    /// Switch a customer between inheriting and custom filters.
    /// A stored override is kept when switching back to inherit.
    pub fn set_mode(&mut self, customer_id: &str, mode: FilterMode) {
        self.modes.insert(customer_id.to_string(), mode);
    }

    /// Store customer-scoped filters; editing them implies custom mode
    pub fn set_customer_filters(&mut self, customer_id: &str, filters: FilterSet) {
        self.customer_filters
            .insert(customer_id.to_string(), filters);
        self.modes
            .insert(customer_id.to_string(), FilterMode::Custom);
    }

    /// Drop everything stored for a deleted customer
    pub fn forget_customer(&mut self, customer_id: &str) {
        self.customer_filters.remove(customer_id);
        self.modes.remove(customer_id);
    }

    /// Effective filters for a customer, or the unscoped view when `None`
    pub fn effective_for(
        &self,
        customer_id: Option<&str>,
        defaults: &FilterSet,
        normalizer: &Normalizer<'_>,
    ) -> FilterSet {
        resolve_effective_filters(
            customer_id,
            self.global.as_ref(),
            &self.customer_filters,
            &self.modes,
            defaults,
            normalizer,
        )
    }
}

/// Work out which filter set governs a customer (or the "all customers" view)
pub fn resolve_effective_filters(
    active_customer: Option<&str>,
    global: Option<&FilterSet>,
    customer_filters: &HashMap<String, FilterSet>,
    modes: &HashMap<String, FilterMode>,
    defaults: &FilterSet,
    normalizer: &Normalizer<'_>,
) -> FilterSet {
    let baseline = normalizer.normalize_filters(global.unwrap_or(defaults));

    let Some(customer_id) = active_customer else {
        return baseline;
    };

    let mode = modes.get(customer_id).copied().unwrap_or_default();
    match (mode, customer_filters.get(customer_id)) {
        (FilterMode::Custom, Some(own)) => {
            info!("Using custom filters for customer {}", customer_id);
            normalizer.normalize_filters(own)
        }
        (FilterMode::Custom, None) => {
            info!(
                "Customer {} is custom but has no stored filters, using global",
                customer_id
            );
            baseline
        }
        (FilterMode::Inherit, _) => baseline,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::FilterMetadata;
    use crate::models::fixtures::{plan, whats_new};
    use crate::models::ReleaseRecord;
    use crate::normalize::NormalizeOptions;
    use pretty_assertions::assert_eq;

    fn metadata() -> FilterMetadata {
        FilterMetadata::build(&[
            ReleaseRecord::ReleasePlan(plan("rp-1", "Sales")),
            ReleaseRecord::WhatsNew(whats_new("wn-1", "Mobile App")),
        ])
    }

    fn sources(values: &[&str]) -> FilterSet {
        FilterSet {
            sources: values.iter().map(|v| v.to_string()).collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_inherit_propagation() {
        let meta = metadata();
        let normalizer = Normalizer::new(&meta, NormalizeOptions::default());
        let defaults = FilterSet::default();

        let mut state = FilterState::default();
        state.set_global(sources(&["release-plan"]));
        state.set_mode("x", FilterMode::Inherit);

        let inherited = state.effective_for(Some("x"), &defaults, &normalizer);
        assert_eq!(inherited.sources, vec!["release-plan".to_string()]);

        state.set_mode("x", FilterMode::Custom);
        let custom_without_override = state.effective_for(Some("x"), &defaults, &normalizer);
        assert_eq!(custom_without_override.sources, vec!["release-plan".to_string()]);

        state.set_customer_filters("x", sources(&["whats-new"]));
        let custom = state.effective_for(Some("x"), &defaults, &normalizer);
        assert_eq!(custom.sources, vec!["whats-new".to_string()]);
        assert_eq!(custom.products, vec!["Mobile App".to_string()]);

        let global = state.effective_for(None, &defaults, &normalizer);
        assert_eq!(global.sources, vec!["release-plan".to_string()]);
    }

    #[test]
    fn test_unknown_customer_inherits() {
        let meta = metadata();
        let normalizer = Normalizer::new(&meta, NormalizeOptions::default());
        let mut state = FilterState::default();
        state.set_global(sources(&["whats-new"]));

        let resolved = state.effective_for(Some("never-seen"), &FilterSet::default(), &normalizer);
        assert_eq!(resolved, state.effective_for(None, &FilterSet::default(), &normalizer));
    }

    #[test]
    fn test_defaults_used_without_global() {
        let meta = metadata();
        let normalizer = Normalizer::new(&meta, NormalizeOptions::default());
        let defaults = FilterSet {
            horizon_months: Some(12),
            ..Default::default()
        };

        let resolved = FilterState::default().effective_for(None, &defaults, &normalizer);
        assert_eq!(resolved.horizon_months, Some(12));
    }

    #[test]
    fn test_switching_back_to_inherit_keeps_override() {
        let meta = metadata();
        let normalizer = Normalizer::new(&meta, NormalizeOptions::default());
        let mut state = FilterState::default();
        state.set_global(sources(&["release-plan"]));
        state.set_customer_filters("x", sources(&["whats-new"]));
        state.set_mode("x", FilterMode::Inherit);

        let resolved = state.effective_for(Some("x"), &FilterSet::default(), &normalizer);
        assert_eq!(resolved.sources, vec!["release-plan".to_string()]);
        assert!(state.customer_filters.contains_key("x"));

        state.forget_customer("x");
        assert_eq!(state.mode("x"), FilterMode::Inherit);
        assert!(!state.customer_filters.contains_key("x"));
    }

    #[test]
    fn test_custom_override_normalized_independently() {
        let meta = metadata();
        let normalizer = Normalizer::new(&meta, NormalizeOptions::default());
        let mut state = FilterState::default();
        state.set_global(sources(&["release-plan"]));
        state.set_customer_filters(
            "x",
            FilterSet {
                products: vec!["Retired Product".into()],
                ..sources(&["whats-new"])
            },
        );

        let resolved = state.effective_for(Some("x"), &FilterSet::default(), &normalizer);
        assert_eq!(resolved.products, vec!["Mobile App".to_string()]);
    }
}
