// Item filtering
//
// Each dimension is an independent predicate; a record is visible when all
// of them pass. Dimensions the record's source doesn't support always pass.
use crate::capability::is_filter_supported;
use crate::filters::{FilterDimension, FilterSet, SortOrder};
use crate::label::normalize_label;
use crate::metadata::FilterMetadata;
use crate::models::{ReleaseRecord, Source};
use crate::normalize::EmptySelectionPolicy;
use chrono::{Datelike, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

/// How many items a single dimension knocks out on its own
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DimensionImpact {
    pub dimension: FilterDimension,
    pub excluded: usize,
}

/// Filter set with the per-pass lookups worked out once
struct Prepared<'f> {
    filters: &'f FilterSet,
    /// Canonical selected products and the sources each occurs in
    products: Vec<(String, BTreeSet<Source>)>,
    query: String,
}

pub struct FilterEngine<'a> {
    metadata: &'a FilterMetadata,
    empty_selection: EmptySelectionPolicy,
    today: NaiveDate,
}

impl<'a> FilterEngine<'a> {
    pub fn new(metadata: &'a FilterMetadata, empty_selection: EmptySelectionPolicy) -> Self {
        Self {
            metadata,
            empty_selection,
            today: Utc::now().date_naive(),
        }
    }

    /// Pin "now" for day windows and the horizon
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    pub fn today(&self) -> NaiveDate {
        self.today
    }

    /// Visible items, ordered by release date per the filter's sort order
    pub fn apply<'r>(
        &self,
        items: &'r [ReleaseRecord],
        filters: &FilterSet,
    ) -> Vec<&'r ReleaseRecord> {
        let prepared = self.prepare(filters);

        let mut visible: Vec<(Option<NaiveDate>, &'r ReleaseRecord)> = items
            .iter()
            .filter(|record| self.matches_prepared(record, &prepared))
            .map(|record| (sort_date(record), record))
            .collect();

        let newest_first = filters.sort_order == SortOrder::Newest;
        // Undated records go last either way
        visible.sort_by(|(a, _), (b, _)| match (a, b) {
            (Some(a), Some(b)) if newest_first => b.cmp(a),
            (Some(a), Some(b)) => a.cmp(b),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        tracing::debug!("{} of {} items visible", visible.len(), items.len());
        visible.into_iter().map(|(_, record)| record).collect()
    }

    pub fn matches(&self, record: &ReleaseRecord, filters: &FilterSet) -> bool {
        self.matches_prepared(record, &self.prepare(filters))
    }

    /// Whether one dimension alone lets the record through
    pub fn passes(
        &self,
        record: &ReleaseRecord,
        filters: &FilterSet,
        dimension: FilterDimension,
    ) -> bool {
        self.passes_prepared(record, &self.prepare(filters), dimension)
    }

    /// Which dimensions are doing the excluding, most restrictive first
    pub fn diagnose(&self, items: &[ReleaseRecord], filters: &FilterSet) -> Vec<DimensionImpact> {
        let prepared = self.prepare(filters);

        let mut impacts: Vec<DimensionImpact> = FilterDimension::all()
            .into_iter()
            .filter(|dim| *dim != FilterDimension::SortOrder)
            .map(|dimension| DimensionImpact {
                dimension,
                excluded: items
                    .iter()
                    .filter(|record| !self.passes_prepared(record, &prepared, dimension))
                    .count(),
            })
            .filter(|impact| impact.excluded > 0)
            .collect();

        impacts.sort_by(|a, b| {
            b.excluded
                .cmp(&a.excluded)
                .then(a.dimension.cmp(&b.dimension))
        });
        impacts
    }

    fn prepare<'f>(&self, filters: &'f FilterSet) -> Prepared<'f> {
        let mut products: Vec<(String, BTreeSet<Source>)> = Vec::new();
        for raw in &filters.products {
            let label = normalize_label(raw);
            if !products.iter().any(|(p, _)| *p == label) {
                let sources = self.metadata.sources_for_product(&label);
                products.push((label, sources));
            }
        }

        Prepared {
            filters,
            products,
            query: filters.query.trim().to_lowercase(),
        }
    }

    fn matches_prepared(&self, record: &ReleaseRecord, prepared: &Prepared<'_>) -> bool {
        FilterDimension::all()
            .into_iter()
            .all(|dim| self.passes_prepared(record, prepared, dim))
    }

    fn passes_prepared(
        &self,
        record: &ReleaseRecord,
        prepared: &Prepared<'_>,
        dimension: FilterDimension,
    ) -> bool {
        // Sources gate everything else and the horizon is global
        let gated = !matches!(dimension, FilterDimension::Source | FilterDimension::Horizon);
        if gated && !is_filter_supported(record.source(), dimension) {
            return true;
        }

        let filters = prepared.filters;
        match dimension {
            FilterDimension::Product => self.product_passes(record, prepared),
            FilterDimension::Query => self.query_passes(record, &prepared.query),
            FilterDimension::NewWithinDays => within_past(
                record.release_date(),
                self.today,
                filters.new_within_days,
            ),
            FilterDimension::ChangedWithinDays => within_past(
                record.changed_date(),
                self.today,
                filters.changed_within_days,
            ),
            FilterDimension::ReleasingWithinDays => within_future(
                record.release_date(),
                self.today,
                filters.releasing_within_days,
            ),
            FilterDimension::DateRange => {
                date_in_range(record.release_date(), filters.date_from, filters.date_to)
            }
            FilterDimension::MinVersion => match (filters.min_version, record.min_version()) {
                (Some(floor), Some(version)) => version >= floor,
                _ => true,
            },
            FilterDimension::Horizon => self.horizon_passes(record, filters),
            FilterDimension::SortOrder => true,
            multi => match filters.selection(multi) {
                Some(selection) => {
                    self.values_pass(&record.dimension_values(multi), selection)
                }
                None => true,
            },
        }
    }

    /// Membership for single-valued fields, intersection for sets
    fn values_pass(&self, values: &[String], selection: &[String]) -> bool {
        if selection.is_empty() {
            return match self.empty_selection {
                EmptySelectionPolicy::Unrestricted => true,
                EmptySelectionPolicy::Restrictive => values.is_empty(),
            };
        }
        values.iter().any(|v| selection.contains(v))
    }

    fn product_passes(&self, record: &ReleaseRecord, prepared: &Prepared<'_>) -> bool {
        let label = record.product_label();
        if prepared.products.is_empty() {
            let values: Vec<String> = if label.is_empty() { Vec::new() } else { vec![label] };
            return self.values_pass(&values, &[]);
        }

        // Picks from another source's products say nothing about this record
        let source = record.source();
        let scoped = prepared
            .products
            .iter()
            .any(|(_, sources)| sources.contains(&source));
        if !scoped {
            return true;
        }

        prepared.products.iter().any(|(p, _)| *p == label)
    }

    fn query_passes(&self, record: &ReleaseRecord, query: &str) -> bool {
        if query.is_empty() {
            return true;
        }

        let common = record.common();
        let haystack = format!(
            "{} {} {}",
            common.title,
            common.summary.as_deref().unwrap_or(""),
            record.product_label()
        )
        .to_lowercase();
        haystack.contains(query)
    }

    fn horizon_passes(&self, record: &ReleaseRecord, filters: &FilterSet) -> bool {
        let Some(month) = record.availability_date().or_else(|| record.release_date()) else {
            return true;
        };

        let offset = month_index(month) - month_index(self.today);
        if let Some(horizon) = filters.horizon_months {
            if offset > i64::from(horizon) {
                return false;
            }
        }
        if let Some(history) = filters.history_months {
            if -offset > i64::from(history) {
                return false;
            }
        }
        true
    }
}

/// Release date, else the first day of the availability month
fn sort_date(record: &ReleaseRecord) -> Option<NaiveDate> {
    record.release_date().or_else(|| record.availability_date())
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn within_past(date: Option<NaiveDate>, today: NaiveDate, days: u32) -> bool {
    if days == 0 {
        return true;
    }
    // A window reaching past the calendar's range is unbounded on that side
    let earliest = today
        .checked_sub_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDate::MIN);
    match date {
        Some(date) => date >= earliest && date <= today,
        None => false,
    }
}

fn within_future(date: Option<NaiveDate>, today: NaiveDate, days: u32) -> bool {
    if days == 0 {
        return true;
    }
    let latest = today
        .checked_add_signed(Duration::days(i64::from(days)))
        .unwrap_or(NaiveDate::MAX);
    match date {
        Some(date) => date >= today && date <= latest,
        None => false,
    }
}

fn date_in_range(date: Option<NaiveDate>, from: Option<NaiveDate>, to: Option<NaiveDate>) -> bool {
    if let Some(from) = from {
        if !date.is_some_and(|d| d >= from) {
            return false;
        }
    }
    if let Some(to) = to {
        if !date.is_some_and(|d| d <= to) {
            return false;
        }
    }
    true
}
