use crate::filters::FilterDimension;
use crate::label::normalize_label;
use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Where an update entry came from
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Source {
    /// Vendor release-plan catalog
    ReleasePlan,
    /// Partner "what's new" changelog
    WhatsNew,
}

impl Source {
    /// Tag used in stored filter selections
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::ReleasePlan => "release-plan",
            Source::WhatsNew => "whats-new",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Source::ReleasePlan => "Release Plans",
            Source::WhatsNew => "What's New",
        }
    }

    pub fn parse(tag: &str) -> Option<Self> {
        Self::all().into_iter().find(|s| s.as_str() == tag.trim())
    }

    pub fn all() -> Vec<Source> {
        vec![Source::ReleasePlan, Source::WhatsNew]
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Lifecycle status of an update
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Planned,
    EarlyAccess,
    PublicPreview,
    GenerallyAvailable,
    RollingOut,
    Launched,
    Deprecated,
}

impl Status {
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Planned => "planned",
            Status::EarlyAccess => "early-access",
            Status::PublicPreview => "public-preview",
            Status::GenerallyAvailable => "generally-available",
            Status::RollingOut => "rolling-out",
            Status::Launched => "launched",
            Status::Deprecated => "deprecated",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Planned => "Planned",
            Status::EarlyAccess => "Early access",
            Status::PublicPreview => "Public preview",
            Status::GenerallyAvailable => "Generally available",
            Status::RollingOut => "Rolling out",
            Status::Launched => "Launched",
            Status::Deprecated => "Deprecated",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub label: String,
    pub url: String,
}

/// Fields every update entry carries regardless of source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecordCommon {
    pub id: String,
    /// Product or app name as the connector delivered it
    pub product: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    pub status: Status,
    /// `YYYY-MM-DD`, `YYYY-MM` or RFC 3339
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub last_updated: Option<String>,
    /// `YYYY-MM`
    #[serde(default)]
    pub availability_month: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub links: Vec<Link>,
}

/// Entry from the vendor release-plan catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReleasePlanItem {
    #[serde(flatten)]
    pub common: RecordCommon,
    #[serde(default)]
    pub wave: Option<String>,
    #[serde(default)]
    pub enabled_for: Option<String>,
    #[serde(default)]
    pub availability_types: Vec<String>,
    #[serde(default)]
    pub geography_countries: Vec<String>,
    /// Free text or an HTML list, used when no countries were extracted upstream
    #[serde(default)]
    pub geography_text: Option<String>,
}

/// Entry from the partner changelog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WhatsNewItem {
    #[serde(flatten)]
    pub common: RecordCommon,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub min_version: Option<u32>,
}

/// Shared view over the per-source record shapes
pub trait ReleaseItem {
    fn source(&self) -> Source;

    fn common(&self) -> &RecordCommon;

    /// Values for dimensions only this source carries
    fn specific_values(&self, dimension: FilterDimension) -> Vec<String>;

    fn min_version(&self) -> Option<u32> {
        None
    }

    /// Cleaned values this record holds for a multi-valued dimension.
    /// Products come back as canonical labels.
    fn dimension_values(&self, dimension: FilterDimension) -> Vec<String> {
        let common = self.common();
        let raw = match dimension {
            FilterDimension::Product => vec![normalize_label(&common.product)],
            FilterDimension::Source => vec![self.source().as_str().to_string()],
            FilterDimension::Status => vec![common.status.as_str().to_string()],
            FilterDimension::Tag => common.tags.clone(),
            FilterDimension::Month => common.availability_month.iter().cloned().collect(),
            other => self.specific_values(other),
        };

        raw.into_iter()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .collect()
    }
}

impl ReleaseItem for ReleasePlanItem {
    fn source(&self) -> Source {
        Source::ReleasePlan
    }

    fn common(&self) -> &RecordCommon {
        &self.common
    }

    fn specific_values(&self, dimension: FilterDimension) -> Vec<String> {
        match dimension {
            FilterDimension::Wave => self.wave.iter().cloned().collect(),
            FilterDimension::EnabledFor => self.enabled_for.iter().cloned().collect(),
            FilterDimension::AvailabilityType => self.availability_types.clone(),
            FilterDimension::Geography => {
                if self.geography_countries.is_empty() {
                    self.geography_text
                        .as_deref()
                        .map(extract_geography)
                        .unwrap_or_default()
                } else {
                    self.geography_countries.clone()
                }
            }
            _ => Vec::new(),
        }
    }
}

impl ReleaseItem for WhatsNewItem {
    fn source(&self) -> Source {
        Source::WhatsNew
    }

    fn common(&self) -> &RecordCommon {
        &self.common
    }

    fn specific_values(&self, dimension: FilterDimension) -> Vec<String> {
        match dimension {
            FilterDimension::Category => self.category.iter().cloned().collect(),
            FilterDimension::Language => self.language.iter().cloned().collect(),
            _ => Vec::new(),
        }
    }

    fn min_version(&self) -> Option<u32> {
        self.min_version
    }
}

/// One update entry, shaped by the source it came from
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "source", rename_all = "kebab-case")]
pub enum ReleaseRecord {
    ReleasePlan(ReleasePlanItem),
    WhatsNew(WhatsNewItem),
}

impl ReleaseRecord {
    fn item(&self) -> &dyn ReleaseItem {
        match self {
            ReleaseRecord::ReleasePlan(item) => item,
            ReleaseRecord::WhatsNew(item) => item,
        }
    }

    pub fn source(&self) -> Source {
        self.item().source()
    }

    pub fn common(&self) -> &RecordCommon {
        self.item().common()
    }

    pub fn id(&self) -> &str {
        &self.common().id
    }

    pub fn title(&self) -> &str {
        &self.common().title
    }

    pub fn status(&self) -> Status {
        self.common().status
    }

    /// Canonical product label
    pub fn product_label(&self) -> String {
        normalize_label(&self.common().product)
    }

    pub fn min_version(&self) -> Option<u32> {
        self.item().min_version()
    }

    pub fn dimension_values(&self, dimension: FilterDimension) -> Vec<String> {
        self.item().dimension_values(dimension)
    }

    pub fn release_date(&self) -> Option<NaiveDate> {
        self.common().release_date.as_deref().and_then(parse_date)
    }

    /// Last update, falling back to the release date
    pub fn changed_date(&self) -> Option<NaiveDate> {
        self.common()
            .last_updated
            .as_deref()
            .and_then(parse_date)
            .or_else(|| self.release_date())
    }

    /// First day of the availability month
    pub fn availability_date(&self) -> Option<NaiveDate> {
        self.common()
            .availability_month
            .as_deref()
            .and_then(parse_year_month)
    }
}

/// Parse an exact day, an RFC 3339 timestamp or a bare `YYYY-MM` month
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.date_naive());
    }
    parse_year_month(raw)
}

/// `YYYY-MM` to the first day of that month
pub fn parse_year_month(raw: &str) -> Option<NaiveDate> {
    let (year, month) = raw.trim().split_once('-')?;
    if year.len() != 4 || month.len() != 2 {
        return None;
    }
    let year: i32 = year.parse().ok()?;
    let month: u32 = month.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, 1)
}

static HTML_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid regex"));
static LIST_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,;\n|]+").expect("valid regex"));

/// Pull country names out of free-text or HTML list geography content
fn extract_geography(text: &str) -> Vec<String> {
    let flattened = HTML_TAG.replace_all(text, "\n");
    let mut countries: Vec<String> = Vec::new();
    for part in LIST_SEPARATOR.split(&flattened) {
        let name = part.split_whitespace().collect::<Vec<_>>().join(" ");
        if !name.is_empty() && !countries.contains(&name) {
            countries.push(name);
        }
    }
    countries
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    pub fn common(id: &str, product: &str) -> RecordCommon {
        RecordCommon {
            id: id.to_string(),
            product: product.to_string(),
            title: format!("Update {}", id),
            summary: None,
            status: Status::PublicPreview,
            release_date: None,
            last_updated: None,
            availability_month: None,
            tags: Vec::new(),
            links: Vec::new(),
        }
    }

    pub fn plan(id: &str, product: &str) -> ReleasePlanItem {
        ReleasePlanItem {
            common: common(id, product),
            wave: None,
            enabled_for: None,
            availability_types: Vec::new(),
            geography_countries: Vec::new(),
            geography_text: None,
        }
    }

    pub fn whats_new(id: &str, product: &str) -> WhatsNewItem {
        WhatsNewItem {
            common: common(id, product),
            category: None,
            language: None,
            min_version: None,
        }
    }
}
