// Selection repair
//
// Stored selections go stale as new items load: products get renamed,
// months roll off, a source stops carrying a tag. The normalizer brings a
// raw FilterSet back in line with the current metadata while favouring
// "show more" over silently hiding everything.
use crate::capability::SourceMatch;
use crate::filters::{FilterDimension, FilterSet};
use crate::label::normalize_label;
use crate::metadata::{FilterMetadata, OptionEntry};
use crate::models::Source;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::debug;

/// What an empty multi-value selection means on a given call path
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmptySelectionPolicy {
    /// Empty = no restriction from this dimension
    #[default]
    Unrestricted,
    /// Empty = nothing selected; only items without a value for the dimension match
    Restrictive,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct NormalizeOptions {
    pub empty_selection: EmptySelectionPolicy,
    pub source_match: SourceMatch,
}

/// The options a selection is validated against
#[derive(Debug, Clone, Copy)]
pub enum OptionSource<'a> {
    /// Metadata entries carrying the sources they occur in
    Sourced(&'a [OptionEntry]),
    /// A bare list of allowed values, valid for any source
    Plain(&'a [String]),
}

impl<'a> OptionSource<'a> {
    /// Values usable with the given active sources
    pub fn available(
        &self,
        active: &BTreeSet<Source>,
        source_match: SourceMatch,
    ) -> Vec<&'a str> {
        match *self {
            OptionSource::Plain(values) => values.iter().map(String::as_str).collect(),
            OptionSource::Sourced(entries) => {
                if active.is_empty() {
                    return Vec::new();
                }
                entries
                    .iter()
                    .filter(|entry| match source_match {
                        SourceMatch::Any => active.iter().any(|s| entry.sources.contains(s)),
                        SourceMatch::All => active.iter().all(|s| entry.sources.contains(s)),
                    })
                    .map(|entry| entry.value.as_str())
                    .collect()
            }
        }
    }
}

/// Repair one multi-value selection.
///
/// Empty input stays empty. Otherwise keep the still-valid values
/// (deduplicated, first occurrence wins); when none survive, fall back to
/// everything currently available.
pub fn normalize_selection(
    raw: &[String],
    options: OptionSource<'_>,
    active: &BTreeSet<Source>,
    source_match: SourceMatch,
) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }

    let available = options.available(active, source_match);

    let mut kept: Vec<String> = Vec::new();
    for value in raw {
        if available.contains(&value.as_str()) && !kept.contains(value) {
            kept.push(value.clone());
        }
    }

    if kept.is_empty() {
        available.into_iter().map(str::to_string).collect()
    } else {
        kept
    }
}

/// Normalizes whole filter sets against one metadata snapshot
#[derive(Debug, Clone, Copy)]
pub struct Normalizer<'a> {
    metadata: &'a FilterMetadata,
    options: NormalizeOptions,
}

impl<'a> Normalizer<'a> {
    pub fn new(metadata: &'a FilterMetadata, options: NormalizeOptions) -> Self {
        Self { metadata, options }
    }

    pub fn options(&self) -> NormalizeOptions {
        self.options
    }

    pub fn metadata(&self) -> &'a FilterMetadata {
        self.metadata
    }

    /// Metadata has arrived; until then selections pass through untouched
    pub fn is_ready(&self) -> bool {
        !self.metadata.is_empty()
    }

    /// Sources the rest of the filter set is scoped to
    pub fn active_sources(&self, filters: &FilterSet) -> BTreeSet<Source> {
        if filters.sources.is_empty() {
            return match self.options.empty_selection {
                EmptySelectionPolicy::Unrestricted => {
                    self.metadata.available_sources().into_iter().collect()
                }
                EmptySelectionPolicy::Restrictive => BTreeSet::new(),
            };
        }

        filters
            .sources
            .iter()
            .filter_map(|tag| Source::parse(tag))
            .collect()
    }

    /// Options for a dimension that make sense under the active sources
    pub fn available_options(
        &self,
        dimension: FilterDimension,
        active: &BTreeSet<Source>,
    ) -> Vec<&'a OptionEntry> {
        let source_match = self.source_match_for(dimension);
        self.metadata
            .options(dimension)
            .iter()
            .filter(|entry| match source_match {
                SourceMatch::Any => active.iter().any(|s| entry.sources.contains(s)),
                SourceMatch::All => {
                    !active.is_empty() && active.iter().all(|s| entry.sources.contains(s))
                }
            })
            .collect()
    }

    pub fn normalize_filters(&self, raw: &FilterSet) -> FilterSet {
        if !self.is_ready() {
            debug!("Metadata not loaded yet, keeping stored selection as-is");
            return raw.clone();
        }

        let mut out = raw.clone();

        // Sources go first: every other dimension is scoped by them
        let known_sources: Vec<String> = self
            .metadata
            .available_sources()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();
        let everything: BTreeSet<Source> = Source::all().into_iter().collect();
        out.sources = normalize_selection(
            &raw.sources,
            OptionSource::Plain(&known_sources),
            &everything,
            SourceMatch::Any,
        );

        let active = self.active_sources(&out);

        for dimension in FilterDimension::MULTI_VALUED {
            if dimension == FilterDimension::Source {
                continue;
            }

            let Some(raw_values) = raw.selection(dimension) else {
                continue;
            };

            let candidates: Vec<String> = if dimension == FilterDimension::Product {
                raw_values
                    .iter()
                    .map(|v| normalize_label(v))
                    .filter(|v| !v.is_empty())
                    .collect()
            } else {
                raw_values.clone()
            };

            // An explicit but fully unusable selection must not read as empty
            let candidates = if candidates.is_empty() && !raw_values.is_empty() {
                raw_values.clone()
            } else {
                candidates
            };

            let options = OptionSource::Sourced(self.metadata.options(dimension));
            let source_match = self.source_match_for(dimension);
            let unrestricted =
                self.options.empty_selection == EmptySelectionPolicy::Unrestricted;

            // "All products" is spelled out so every active source stays covered
            let repaired = if dimension == FilterDimension::Product
                && raw_values.is_empty()
                && unrestricted
            {
                options
                    .available(&active, source_match)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            } else {
                normalize_selection(&candidates, options, &active, source_match)
            };

            if &repaired != raw_values {
                debug!(
                    "Repaired {} selection: {:?} -> {:?}",
                    dimension, raw_values, repaired
                );
            }

            if let Some(slot) = out.selection_mut(dimension) {
                *slot = repaired;
            }
        }

        let explicit_empty = raw.products.is_empty()
            && self.options.empty_selection == EmptySelectionPolicy::Restrictive;
        if !explicit_empty {
            self.ensure_product_coverage(&mut out.products, &active);
        }

        out
    }

    /// Make sure every active source keeps at least one selected product
    fn ensure_product_coverage(&self, products: &mut Vec<String>, active: &BTreeSet<Source>) {
        for source in active {
            let source_products = self.metadata.products_for_source(*source);
            if source_products.is_empty() {
                continue;
            }

            let covered = products
                .iter()
                .any(|p| source_products.contains(&p.as_str()));
            if covered {
                continue;
            }

            debug!(
                "No selected product for {}, adding all {} of its products",
                source,
                source_products.len()
            );
            for product in source_products {
                if !products.iter().any(|p| p == product) {
                    products.push(product.to_string());
                }
            }
        }
    }

    /// Product coverage is per source, so products always match on any active source
    fn source_match_for(&self, dimension: FilterDimension) -> SourceMatch {
        if dimension == FilterDimension::Product {
            SourceMatch::Any
        } else {
            self.options.source_match
        }
    }
}
