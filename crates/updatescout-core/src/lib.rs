// Filtering, normalization and per-customer curation of product update feeds
pub mod capability;
pub mod config;
pub mod curator;
pub mod customers;
pub mod error;
pub mod export;
pub mod filters;
pub mod label;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod predicate;
pub mod resolve;
pub mod store;

pub use capability::{dimensions_for_sources, is_filter_supported, supported_dimensions, SourceMatch};
pub use config::Config;
pub use curator::Curator;
pub use customers::{Customer, CustomerDirectory, CustomerGroup};
pub use error::Error;
pub use export::{ExportFormat, Exporter};
pub use filters::{FilterDimension, FilterSet, SortOrder};
pub use label::normalize_label;
pub use metadata::{FilterMetadata, OptionEntry};
pub use models::{ReleaseItem, ReleaseRecord, Source, Status};
pub use normalize::{normalize_selection, EmptySelectionPolicy, NormalizeOptions, Normalizer};
pub use predicate::{DimensionImpact, FilterEngine};
pub use resolve::{resolve_effective_filters, FilterMode, FilterState};
pub use store::{load_state_or_default, FilterStore, InMemoryStore, JsonFileStore};

/// Result type alias because typing Result<T, Error> everywhere is tedious
pub type Result<T> = std::result::Result<T, Error>;
