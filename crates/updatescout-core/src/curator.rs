use crate::config::Config;
use crate::customers::{Customer, CustomerDirectory};
use crate::export::{ExportFormat, Exporter};
use crate::filters::FilterSet;
use crate::metadata::FilterMetadata;
use crate::models::ReleaseRecord;
use crate::normalize::Normalizer;
use crate::predicate::{DimensionImpact, FilterEngine};
use crate::resolve::FilterState;
use crate::store::{load_state_or_default, FilterStore};
use crate::Result;
use chrono::NaiveDate;
use std::path::Path;
use tracing::info;

/// One loaded snapshot of release items plus everything needed to filter it
pub struct Curator {
    items: Vec<ReleaseRecord>,
    metadata: FilterMetadata,
    config: Config,
    today: Option<NaiveDate>,
}

impl Curator {
    pub fn new(items: Vec<ReleaseRecord>, config: Config) -> Self {
        let metadata = FilterMetadata::build(&items);
        info!(
            "Loaded {} items across {} sources",
            metadata.item_count(),
            metadata.available_sources().len()
        );
        Self {
            items,
            metadata,
            config,
            today: None,
        }
    }

    /// Parse a JSON array of tagged release records
    pub fn from_json(raw: &str, config: Config) -> Result<Self> {
        let items: Vec<ReleaseRecord> = serde_json::from_str(raw)?;
        Ok(Self::new(items, config))
    }

    /// Pin the date used for relative windows
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn items(&self) -> &[ReleaseRecord] {
        &self.items
    }

    pub fn metadata(&self) -> &FilterMetadata {
        &self.metadata
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn normalizer(&self) -> Normalizer<'_> {
        Normalizer::new(&self.metadata, self.config.normalization)
    }

    pub fn engine(&self) -> FilterEngine<'_> {
        let engine = FilterEngine::new(&self.metadata, self.config.normalization.empty_selection);
        match self.today {
            Some(today) => engine.with_today(today),
            None => engine,
        }
    }

    pub fn effective_filters(&self, state: &FilterState, customer_id: Option<&str>) -> FilterSet {
        state.effective_for(
            customer_id,
            &self.config.default_filters(),
            &self.normalizer(),
        )
    }

    /// Items visible under a filter set. Targeting picks customers, not items.
    pub fn visible_items(&self, filters: &FilterSet) -> Vec<&ReleaseRecord> {
        self.engine()
            .apply(&self.items, &filters.without_targeting())
    }

    pub fn diagnose(&self, filters: &FilterSet) -> Vec<DimensionImpact> {
        self.engine()
            .diagnose(&self.items, &filters.without_targeting())
    }

    pub fn audience<'d>(
        &self,
        directory: &'d CustomerDirectory,
        filters: &FilterSet,
    ) -> Vec<&'d Customer> {
        directory.resolve_audience(filters)
    }

    /// Normalize a filter set and persist it as the global set or a customer's override.
    /// With no items loaded the selection is stored as given.
    pub fn store_filters(
        &self,
        store: &dyn FilterStore,
        customer_id: Option<&str>,
        filters: &FilterSet,
    ) -> Result<FilterState> {
        let normalized = self.normalizer().normalize_filters(filters);

        let mut state = load_state_or_default(store);
        match customer_id {
            Some(id) => state.set_customer_filters(id, normalized),
            None => state.set_global(normalized),
        }
        store.save(&state)?;
        Ok(state)
    }

    pub fn export(
        &self,
        filters: &FilterSet,
        format: ExportFormat,
        customer_name: Option<&str>,
    ) -> Result<String> {
        let visible = self.visible_items(filters);
        Exporter::new(self.config.export.clone()).render(&visible, format, customer_name)
    }

    /// Write visible items to `path`, format taken from its extension. Returns the item count.
    pub fn export_to_file<P: AsRef<Path>>(
        &self,
        filters: &FilterSet,
        path: P,
        customer_name: Option<&str>,
    ) -> Result<usize> {
        let visible = self.visible_items(filters);
        Exporter::new(self.config.export.clone()).export_to_file(&visible, path, customer_name)?;
        Ok(visible.len())
    }
}
