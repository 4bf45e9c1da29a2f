use crate::config::ExportConfig;
use crate::models::ReleaseRecord;
use crate::{Error, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Export format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Markdown,
}

impl ExportFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            "md" | "markdown" => Some(ExportFormat::Markdown),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Markdown => "md",
        }
    }
}

/// Renders filtered update lists for sharing with customers
pub struct Exporter {
    options: ExportConfig,
}

impl Exporter {
    pub fn new(options: ExportConfig) -> Self {
        Self { options }
    }

    /// Export to a file, picking the format from its extension
    pub fn export_to_file<P: AsRef<Path>>(
        &self,
        items: &[&ReleaseRecord],
        path: P,
        customer: Option<&str>,
    ) -> Result<()> {
        let path = path.as_ref();

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(ExportFormat::from_extension)
            .ok_or_else(|| {
                Error::ExportError(
                    "Could not determine export format from extension. Use .json, .csv, or .md"
                        .to_string(),
                )
            })?;

        let content = self.render(items, format, customer)?;

        let mut file = File::create(path)
            .map_err(|e| Error::ExportError(format!("Failed to create file: {}", e)))?;
        file.write_all(content.as_bytes())
            .map_err(|e| Error::ExportError(format!("Failed to write file: {}", e)))?;

        Ok(())
    }

    pub fn render(
        &self,
        items: &[&ReleaseRecord],
        format: ExportFormat,
        customer: Option<&str>,
    ) -> Result<String> {
        match format {
            ExportFormat::Json => Self::to_json(items),
            ExportFormat::Csv => Ok(Self::to_csv(items)),
            ExportFormat::Markdown => Ok(self.to_markdown(items, customer)),
        }
    }

    pub fn to_json(items: &[&ReleaseRecord]) -> Result<String> {
        Ok(serde_json::to_string_pretty(items)?)
    }

    pub fn to_csv(items: &[&ReleaseRecord]) -> String {
        let mut output = String::new();

        output.push_str("Source,Product,Title,Status,Release Date,Availability Month,Tags,Link\n");

        for item in items {
            let common = item.common();
            output.push_str(&format!(
                "{},{},{},{},{},{},{},{}\n",
                item.source().as_str(),
                Self::escape_csv(&item.product_label()),
                Self::escape_csv(&common.title),
                item.status().label(),
                common.release_date.as_deref().unwrap_or(""),
                common.availability_month.as_deref().unwrap_or(""),
                Self::escape_csv(&common.tags.join("; ")),
                common.links.first().map(|l| l.url.as_str()).unwrap_or(""),
            ));
        }

        output
    }

    /// One section per product in first-appearance order, items in the order given
    pub fn to_markdown(&self, items: &[&ReleaseRecord], customer: Option<&str>) -> String {
        let mut output = String::new();

        output.push_str(&format!("# {}\n\n", self.options.title));
        if let Some(customer) = customer {
            output.push_str(&format!("Prepared for **{}**\n\n", customer));
        }

        if items.is_empty() {
            output.push_str("_No updates match the current filters._\n");
            return output;
        }

        let mut sections: Vec<(String, Vec<&ReleaseRecord>)> = Vec::new();
        for item in items {
            let product = item.product_label();
            match sections.iter_mut().find(|(p, _)| *p == product) {
                Some((_, entries)) => entries.push(item),
                None => sections.push((product, vec![item])),
            }
        }

        for (product, entries) in sections {
            let heading = if product.is_empty() {
                "Other"
            } else {
                product.as_str()
            };
            output.push_str(&format!("## {}\n\n", heading));

            for item in entries {
                self.push_item(&mut output, item);
            }
            output.push('\n');
        }

        output
    }

    fn push_item(&self, output: &mut String, item: &ReleaseRecord) {
        let common = item.common();

        let mut details = vec![item.status().label().to_string()];
        if let Some(date) = common
            .release_date
            .as_deref()
            .or(common.availability_month.as_deref())
        {
            details.push(date.to_string());
        }
        output.push_str(&format!(
            "- **{}** ({})\n",
            common.title.trim(),
            details.join(", ")
        ));

        if self.options.include_summary {
            if let Some(summary) = common.summary.as_deref().filter(|s| !s.trim().is_empty()) {
                let summary = summary.split_whitespace().collect::<Vec<_>>().join(" ");
                output.push_str(&format!("  {}\n", summary));
            }
        }

        for link in &common.links {
            output.push_str(&format!("  - [{}]({})\n", link.label, link.url));
        }
    }

    /// Escape CSV special characters
    fn escape_csv(s: &str) -> String {
        if s.contains(',') || s.contains('"') || s.contains('\n') {
            format!("\"{}\"", s.replace('"', "\"\""))
        } else {
            s.to_string()
        }
    }
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::{plan, whats_new};
    use crate::models::Link;

    fn records() -> Vec<ReleaseRecord> {
        let mut a = plan("a", "sales");
        a.common.title = "Forecast insights".into();
        a.common.release_date = Some("2025-04-01".into());
        a.common.summary = Some("Predictive   forecasting\nfor sellers".into());
        a.common.links = vec![Link {
            label: "Docs".into(),
            url: "https://learn.example.com/forecast".into(),
        }];

        let mut b = whats_new("b", "Field Service");
        b.common.title = "Offline maps".into();
        b.common.availability_month = Some("2025-05".into());

        let mut c = plan("c", "Sales");
        c.common.title = "Email, drafting".into();

        vec![
            ReleaseRecord::ReleasePlan(a),
            ReleaseRecord::WhatsNew(b),
            ReleaseRecord::ReleasePlan(c),
        ]
    }

    #[test]
    fn test_export_format_detection() {
        assert_eq!(
            ExportFormat::from_extension("JSON"),
            Some(ExportFormat::Json)
        );
        assert_eq!(ExportFormat::from_extension("csv"), Some(ExportFormat::Csv));
        assert_eq!(
            ExportFormat::from_extension("markdown"),
            Some(ExportFormat::Markdown)
        );
        assert_eq!(ExportFormat::from_extension("txt"), None);
    }

    #[test]
    fn test_markdown_groups_by_product() {
        let records = records();
        let items: Vec<&ReleaseRecord> = records.iter().collect();
        let md = Exporter::default().to_markdown(&items, Some("Contoso"));

        let headers: Vec<&str> = md.lines().filter(|l| l.starts_with("## ")).collect();
        assert_eq!(headers, vec!["## Sales", "## Field Service"]);
        assert!(md.starts_with("# Product Updates\n"));
        assert!(md.contains("Prepared for **Contoso**"));

        let forecast = md.find("Forecast insights").unwrap();
        let email = md.find("Email, drafting").unwrap();
        let field = md.find("## Field Service").unwrap();
        assert!(forecast < email && email < field);
    }

    #[test]
    fn test_markdown_item_details() {
        let records = records();
        let items: Vec<&ReleaseRecord> = records.iter().collect();
        let md = Exporter::default().to_markdown(&items, None);

        assert!(md.contains("- **Forecast insights** (Public preview, 2025-04-01)"));
        assert!(md.contains("  Predictive forecasting for sellers"));
        assert!(md.contains("  - [Docs](https://learn.example.com/forecast)"));
        assert!(md.contains("- **Offline maps** (Public preview, 2025-05)"));
    }

    #[test]
    fn test_markdown_without_summaries() {
        let records = records();
        let items: Vec<&ReleaseRecord> = records.iter().collect();
        let exporter = Exporter::new(ExportConfig {
            title: "Q2 Highlights".into(),
            include_summary: false,
        });
        let md = exporter.to_markdown(&items, None);
        assert!(md.starts_with("# Q2 Highlights"));
        assert!(!md.contains("Predictive"));
    }

    #[test]
    fn test_empty_export() {
        let md = Exporter::default().to_markdown(&[], None);
        assert!(md.contains("No updates match"));
        assert!(!md.contains("## "));
    }

    #[test]
    fn test_csv_export() {
        let records = records();
        let items: Vec<&ReleaseRecord> = records.iter().collect();
        let csv = Exporter::to_csv(&items);
        assert!(csv.starts_with("Source,Product,Title"));
        assert!(csv.contains("release-plan,Sales,Forecast insights"));
        assert!(csv.contains("\"Email, drafting\""));
    }

    #[test]
    fn test_json_export() {
        let records = records();
        let items: Vec<&ReleaseRecord> = records.iter().collect();
        let json = Exporter::to_json(&items).unwrap();
        assert!(json.contains("\"source\": \"whats-new\""));
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(Exporter::escape_csv("simple"), "simple");
        assert_eq!(Exporter::escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(Exporter::escape_csv("with\"quote"), "\"with\"\"quote\"");
    }

    #[test]
    fn test_export_to_file_needs_known_extension() {
        let dir = tempfile::TempDir::new().unwrap();
        let records = records();
        let items: Vec<&ReleaseRecord> = records.iter().collect();

        let bad = Exporter::default().export_to_file(&items, dir.path().join("out.txt"), None);
        assert!(matches!(bad, Err(Error::ExportError(_))));

        let path = dir.path().join("out.md");
        Exporter::default()
            .export_to_file(&items, &path, None)
            .unwrap();
        assert!(std::fs::read_to_string(path).unwrap().contains("## Sales"));
    }
}
