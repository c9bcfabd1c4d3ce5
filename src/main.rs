use clap::Parser;
use docquery::{Command, DocumentQuery, ExpressionParser, QueryModel, StoreConfig};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "docquery")]
#[command(about = "Compile a document query description into parameterized SQL", long_about = None)]
struct Args {
    /// Store configuration file (defaults to ./docquery.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON file holding the query description
    #[arg(short, long)]
    query: PathBuf,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "docquery=debug"
    } else {
        "docquery=info"
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = match &args.config {
        Some(path) => StoreConfig::load_file(path)?,
        None if PathBuf::from(docquery::config::CONFIG_FILE_NAME).exists() => {
            StoreConfig::load(&std::env::current_dir()?)?
        }
        None => {
            tracing::info!("No configuration file, using defaults");
            StoreConfig::default()
        }
    };

    let content = std::fs::read_to_string(&args.query)?;
    let query: QueryModel = serde_json::from_str(&content)?;
    let mapping = config.mapping_for(query.item_type())?;
    let parser = ExpressionParser::new();

    let mut command = Command::new();
    let mode = DocumentQuery::new(&mapping, &query, &parser).compile(&mut command)?;
    tracing::info!("Compiled {} query as {:?}", query.item_type(), mode);

    println!("{}", serde_json::to_string_pretty(&command)?);
    Ok(())
}
