use crate::filters::FilterDimension;
use crate::models::{ReleaseRecord, Source};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// One pickable value for a dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionEntry {
    pub value: String,
    /// Occurrences across all items (multi-valued fields count each occurrence)
    pub count: usize,
    /// Sources that contain this value at least once
    pub sources: BTreeSet<Source>,
}

impl OptionEntry {
    pub fn has_source(&self, source: Source) -> bool {
        self.sources.contains(&source)
    }
}

/// Per-dimension option lists computed from the loaded items
#[derive(Debug, Clone, Default, Serialize)]
pub struct FilterMetadata {
    options: BTreeMap<FilterDimension, Vec<OptionEntry>>,
    item_count: usize,
}

impl FilterMetadata {
    /// Single pass over the items, accumulating counts and source sets
    pub fn build(items: &[ReleaseRecord]) -> Self {
        let mut acc: HashMap<FilterDimension, HashMap<String, (usize, BTreeSet<Source>)>> =
            HashMap::new();

        for item in items {
            let source = item.source();
            for dimension in FilterDimension::MULTI_VALUED {
                for value in item.dimension_values(dimension) {
                    let entry = acc
                        .entry(dimension)
                        .or_default()
                        .entry(value)
                        .or_insert_with(|| (0, BTreeSet::new()));
                    entry.0 += 1;
                    entry.1.insert(source);
                }
            }
        }

        let options = acc
            .into_iter()
            .map(|(dimension, values)| {
                let mut entries: Vec<OptionEntry> = values
                    .into_iter()
                    .map(|(value, (count, sources))| OptionEntry {
                        value,
                        count,
                        sources,
                    })
                    .collect();

                // Months are a recency picker, everything else reads alphabetically
                if dimension == FilterDimension::Month {
                    entries.sort_by(|a, b| b.value.cmp(&a.value));
                } else {
                    entries.sort_by(|a, b| a.value.cmp(&b.value));
                }
                (dimension, entries)
            })
            .collect();

        tracing::debug!("Built filter metadata from {} items", items.len());

        Self {
            options,
            item_count: items.len(),
        }
    }

    /// No items loaded yet
    pub fn is_empty(&self) -> bool {
        self.item_count == 0
    }

    pub fn item_count(&self) -> usize {
        self.item_count
    }

    pub fn options(&self, dimension: FilterDimension) -> &[OptionEntry] {
        self.options
            .get(&dimension)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn option(&self, dimension: FilterDimension, value: &str) -> Option<&OptionEntry> {
        self.options(dimension).iter().find(|o| o.value == value)
    }

    /// Sources with at least one item
    pub fn available_sources(&self) -> Vec<Source> {
        self.options(FilterDimension::Source)
            .iter()
            .filter_map(|o| Source::parse(&o.value))
            .collect()
    }

    /// Canonical product labels that occur in a source
    pub fn products_for_source(&self, source: Source) -> Vec<&str> {
        self.options(FilterDimension::Product)
            .iter()
            .filter(|o| o.has_source(source))
            .map(|o| o.value.as_str())
            .collect()
    }

    pub fn sources_for_product(&self, label: &str) -> BTreeSet<Source> {
        self.option(FilterDimension::Product, label)
            .map(|o| o.sources.clone())
            .unwrap_or_default()
    }
}
