use anyhow::{bail, Context};
use chrono::NaiveDate;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use updatescout_core::{
    dimensions_for_sources, load_state_or_default, supported_dimensions, Config, Curator,
    CustomerDirectory, ExportFormat, FilterDimension, FilterMode, FilterSet, FilterStore,
    JsonFileStore, Source,
};

#[derive(Parser)]
#[command(name = "updatescout")]
#[command(version, about = "Curate product update feeds per customer", long_about = None)]
struct Cli {
    /// JSON array of release records
    #[arg(long, global = true, env = "UPDATESCOUT_ITEMS")]
    items: Option<PathBuf>,

    /// Filter state file (defaults to the configured or platform location)
    #[arg(long, global = true)]
    state: Option<PathBuf>,

    /// Customer directory JSON
    #[arg(long, global = true, env = "UPDATESCOUT_CUSTOMERS")]
    customers: Option<PathBuf>,

    /// Config file to use instead of the default one
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend today is this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    today: Option<NaiveDate>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// List filter options usable under a customer's (or the global) active sources
    Metadata {
        /// Only this dimension (e.g. product, wave, category)
        dimension: Option<String>,
        #[arg(long)]
        customer: Option<String>,
    },
    /// Print the effective filters for a customer or the global view
    Resolve {
        #[arg(long)]
        customer: Option<String>,
    },
    /// Normalize and store a filter set read from a JSON file
    Set {
        /// Filter set JSON
        file: PathBuf,
        /// Store as this customer's custom filters instead of the global set
        #[arg(long)]
        customer: Option<String>,
    },
    /// Switch a customer between inheriting and custom filters
    Mode {
        customer: String,
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Export visible items to a file, or to stdout when no file is given
    Export {
        output: Option<PathBuf>,
        /// md, json or csv; also picks the extension when OUTPUT has none
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        customer: Option<String>,
    },
    /// Show which customers the effective filters target
    Audience {
        #[arg(long)]
        customer: Option<String>,
    },
    /// Show which filters hide the most items
    Diagnose {
        #[arg(long)]
        customer: Option<String>,
    },
    /// Manage the customer directory
    Customer {
        #[command(subcommand)]
        action: CustomerAction,
    },
    /// Print the active configuration, or write it to the default location
    Config {
        #[arg(long)]
        init: bool,
    },
}

#[derive(clap::Subcommand)]
enum CustomerAction {
    /// List customers and groups
    List,
    /// Add a customer
    Add {
        name: String,
        #[arg(long)]
        owner: Option<String>,
    },
    /// Delete a customer and its stored filters
    Delete { id: String },
    /// Create a customer group
    Group { name: String },
    /// Put a customer into a group
    Join { customer: String, group: String },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Inherit,
    Custom,
}

impl From<ModeArg> for FilterMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Inherit => FilterMode::Inherit,
            ModeArg::Custom => FilterMode::Custom,
        }
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logging - helps when things go sideways
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "updatescout=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => Config::load().context("Failed to load config")?,
    };

    let state_path = match (&cli.state, &config.storage.state_path) {
        (Some(path), _) | (None, Some(path)) => path.clone(),
        (None, None) => JsonFileStore::default_path()?,
    };
    let store = JsonFileStore::new(state_path);

    let Some(command) = cli.command else {
        println!("No command specified. Try --help");
        return Ok(());
    };

    match command {
        Commands::Metadata {
            dimension,
            customer,
        } => {
            let curator = load_curator(cli.items.as_deref(), config, cli.today)?;
            let state = load_state_or_default(&store);
            let filters = curator.effective_filters(&state, customer.as_deref());
            let normalizer = curator.normalizer();
            let active = normalizer.active_sources(&filters);

            println!("{} items", curator.metadata().item_count());
            for source in &active {
                let dims: Vec<String> = supported_dimensions(*source)
                    .into_iter()
                    .filter(|d| !FilterDimension::MULTI_VALUED.contains(d))
                    .map(|d| d.to_string())
                    .collect();
                println!("{}: also filters by {}", source.label(), dims.join(", "));
            }

            let active_list: Vec<Source> = active.iter().copied().collect();
            let dimensions = match dimension {
                Some(name) => vec![parse_dimension(&name)?],
                None => dimensions_for_sources(&active_list, normalizer.options().source_match)
                    .into_iter()
                    .filter(|d| d.is_multi_valued())
                    .collect(),
            };

            for dim in dimensions {
                let options = normalizer.available_options(dim, &active);
                if options.is_empty() {
                    continue;
                }
                println!("\n{}:", dim.label());
                for entry in options {
                    let sources: Vec<&str> = entry.sources.iter().map(|s| s.as_str()).collect();
                    println!(
                        "  {} ({}) [{}]",
                        entry.value,
                        entry.count,
                        sources.join(", ")
                    );
                }
            }
        }
        Commands::Resolve { customer } => {
            let curator = load_curator(cli.items.as_deref(), config, cli.today)?;
            let state = load_state_or_default(&store);
            let filters = curator.effective_filters(&state, customer.as_deref());

            let scalars: Vec<String> = FilterDimension::all()
                .into_iter()
                .filter(|d| filters.is_scalar_active(*d))
                .map(|d| d.to_string())
                .collect();
            tracing::info!("Active scalar filters: [{}]", scalars.join(", "));

            println!("{}", serde_json::to_string_pretty(&filters)?);
        }
        Commands::Set { file, customer } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            let filters: FilterSet = serde_json::from_str(&raw)
                .with_context(|| format!("{} is not a valid filter set", file.display()))?;

            // Without items there is nothing to normalize against yet
            let curator = match cli.items.as_deref() {
                Some(_) => load_curator(cli.items.as_deref(), config, cli.today)?,
                None => {
                    tracing::warn!("No --items given, storing filters without normalization");
                    Curator::new(Vec::new(), config)
                }
            };
            curator.store_filters(&store, customer.as_deref(), &filters)?;
            tracing::info!("Saved filters to {}", store.path().display());
        }
        Commands::Mode { customer, mode } => {
            let mut state = load_state_or_default(&store);
            state.set_mode(&customer, mode.into());
            store.save(&state)?;
            println!("{} now uses {:?} filters", customer, state.mode(&customer));
        }
        Commands::Export {
            output,
            format,
            customer,
        } => {
            let format = match format.as_deref() {
                Some(name) => Some(
                    ExportFormat::from_extension(name)
                        .with_context(|| format!("Unknown export format '{}'", name))?,
                ),
                None => None,
            };

            let curator = load_curator(cli.items.as_deref(), config, cli.today)?;
            let state = load_state_or_default(&store);
            let filters = curator.effective_filters(&state, customer.as_deref());

            let customer_name = match (&customer, &cli.customers) {
                (Some(id), Some(path)) => load_directory(path)?
                    .customer(id)
                    .map(|c| c.name.clone())
                    .or_else(|| Some(id.clone())),
                (Some(id), None) => Some(id.clone()),
                (None, _) => None,
            };

            match output {
                Some(path) => {
                    let path = match format {
                        Some(format) if path.extension().is_none() => {
                            path.with_extension(format.extension())
                        }
                        _ => path,
                    };
                    let count =
                        curator.export_to_file(&filters, &path, customer_name.as_deref())?;
                    println!("Exported {} items to {}", count, path.display());
                }
                None => {
                    let format = format.unwrap_or(ExportFormat::Markdown);
                    print!(
                        "{}",
                        curator.export(&filters, format, customer_name.as_deref())?
                    );
                }
            }
        }
        Commands::Audience { customer } => {
            let directory = load_directory(require_customers(&cli.customers)?)?;
            let curator = load_curator(cli.items.as_deref(), config, cli.today)?;
            let state = load_state_or_default(&store);
            let filters = curator.effective_filters(&state, customer.as_deref());

            for member in curator.audience(&directory, &filters) {
                println!("{}  {}", member.id, member.name);
            }
        }
        Commands::Diagnose { customer } => {
            let curator = load_curator(cli.items.as_deref(), config, cli.today)?;
            let state = load_state_or_default(&store);
            let filters = curator.effective_filters(&state, customer.as_deref());

            let visible = curator.visible_items(&filters).len();
            println!("{} of {} items visible", visible, curator.items().len());
            for impact in curator.diagnose(&filters) {
                println!("  {:<24} hides {}", impact.dimension.label(), impact.excluded);
            }
        }
        Commands::Customer { action } => {
            let path = require_customers(&cli.customers)?;
            let mut directory = load_directory(path)?;

            match action {
                CustomerAction::List => {
                    let state = load_state_or_default(&store);
                    for customer in directory.customers() {
                        let mode = state.mode(&customer.id);
                        println!("{}  {}  ({:?})", customer.id, customer.name, mode);
                    }
                    for group in directory.groups() {
                        let members: Vec<&str> = directory
                            .members_of(&group.id)
                            .into_iter()
                            .map(|c| c.name.as_str())
                            .collect();
                        println!("group {}  {}: {}", group.id, group.name, members.join(", "));
                    }
                    return Ok(());
                }
                CustomerAction::Add { name, owner } => {
                    let customer = directory.create_customer(name, owner);
                    println!("Added {}  {}", customer.id, customer.name);
                }
                CustomerAction::Delete { id } => {
                    let customer = directory.delete_customer(&id, &store)?;
                    println!("Deleted {}  {}", customer.id, customer.name);
                }
                CustomerAction::Group { name } => {
                    let group = directory.add_group(name);
                    println!("Created group {}  {}", group.id, group.name);
                }
                CustomerAction::Join { customer, group } => {
                    directory.add_to_group(&customer, &group)?;
                }
            }

            directory
                .save(path)
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }
        Commands::Config { init } => {
            if init {
                let path = config.save().context("Failed to write config")?;
                println!("Wrote {}", path.display());
            } else {
                print!("{}", config.to_toml()?);
            }
        }
    }

    Ok(())
}

fn load_curator(
    items: Option<&Path>,
    config: Config,
    today: Option<NaiveDate>,
) -> anyhow::Result<Curator> {
    let Some(path) = items else {
        bail!("--items is required (or set UPDATESCOUT_ITEMS)");
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read items from {}", path.display()))?;
    let curator = Curator::from_json(&raw, config)
        .with_context(|| format!("Failed to parse items in {}", path.display()))?;

    Ok(match today {
        Some(today) => curator.with_today(today),
        None => curator,
    })
}

fn require_customers(path: &Option<PathBuf>) -> anyhow::Result<&Path> {
    match path {
        Some(path) => Ok(path),
        None => bail!("--customers is required (or set UPDATESCOUT_CUSTOMERS)"),
    }
}

fn load_directory(path: &Path) -> anyhow::Result<CustomerDirectory> {
    CustomerDirectory::load(path)
        .with_context(|| format!("Failed to read customers from {}", path.display()))
}

fn parse_dimension(name: &str) -> anyhow::Result<FilterDimension> {
    serde_json::from_value(serde_json::Value::String(name.to_string()))
        .with_context(|| format!("Unknown filter dimension '{}'", name))
}
