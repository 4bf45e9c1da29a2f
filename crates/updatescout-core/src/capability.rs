// Which filter dimensions mean something for which source
use crate::filters::FilterDimension;
use crate::models::Source;

/// How a dimension must relate to a set of active sources
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceMatch {
    /// At least one active source supports it
    #[default]
    Any,
    /// Every active source supports it
    All,
}

/// Static capability lookup. Filtering on a dimension the record's source
/// doesn't support must never exclude the record.
pub fn is_filter_supported(source: Source, dimension: FilterDimension) -> bool {
    match dimension {
        FilterDimension::Wave
        | FilterDimension::EnabledFor
        | FilterDimension::AvailabilityType
        | FilterDimension::Geography => source == Source::ReleasePlan,
        FilterDimension::Category | FilterDimension::Language | FilterDimension::MinVersion => {
            source == Source::WhatsNew
        }
        _ => true,
    }
}

/// Every dimension a source supports
pub fn supported_dimensions(source: Source) -> Vec<FilterDimension> {
    FilterDimension::all()
        .into_iter()
        .filter(|dim| is_filter_supported(source, *dim))
        .collect()
}

/// Dimensions worth exposing as controls for a set of active sources
pub fn dimensions_for_sources(active: &[Source], mode: SourceMatch) -> Vec<FilterDimension> {
    if active.is_empty() {
        return Vec::new();
    }

    FilterDimension::all()
        .into_iter()
        .filter(|dim| match mode {
            SourceMatch::Any => active.iter().any(|s| is_filter_supported(*s, *dim)),
            SourceMatch::All => active.iter().all(|s| is_filter_supported(*s, *dim)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_specific_dimensions() {
        assert!(is_filter_supported(Source::ReleasePlan, FilterDimension::Wave));
        assert!(!is_filter_supported(Source::WhatsNew, FilterDimension::Wave));
        assert!(is_filter_supported(Source::WhatsNew, FilterDimension::MinVersion));
        assert!(!is_filter_supported(Source::ReleasePlan, FilterDimension::Language));
    }

    #[test]
    fn test_shared_dimensions_supported_everywhere() {
        for source in Source::all() {
            assert!(is_filter_supported(source, FilterDimension::Source));
            assert!(is_filter_supported(source, FilterDimension::Product));
            assert!(is_filter_supported(source, FilterDimension::Horizon));
        }
    }

    #[test]
    fn test_dimensions_for_sources() {
        let both = [Source::ReleasePlan, Source::WhatsNew];

        let any = dimensions_for_sources(&both, SourceMatch::Any);
        assert!(any.contains(&FilterDimension::Wave));
        assert!(any.contains(&FilterDimension::Category));

        let all = dimensions_for_sources(&both, SourceMatch::All);
        assert!(!all.contains(&FilterDimension::Wave));
        assert!(all.contains(&FilterDimension::Tag));

        assert!(dimensions_for_sources(&[], SourceMatch::Any).is_empty());
    }

    #[test]
    fn test_supported_dimensions() {
        let dims = supported_dimensions(Source::WhatsNew);
        assert!(dims.contains(&FilterDimension::Language));
        assert!(!dims.contains(&FilterDimension::Geography));
    }
}
