//! Command-line demo for the Fieldbook client: list, page, add, edit and
//! delete records of a sheet. Records are printed to stdout as JSON lines.

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use fieldbook_core::{
    Credentials, FieldbookClient, ListRequest, Pager, Projection, Record, RecordId, Session,
    UreqTransport, DEFAULT_BASE_URL,
};
use serde_json::{Map, Value};
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Page size for `list --all` when no `--limit` is given.
const DEFAULT_PAGE_SIZE: u64 = 5;

#[derive(Parser, Debug)]
#[command(name = "fieldbook", version, about = "Browse and edit Fieldbook sheets")]
struct Cli {
    /// API root
    #[arg(long, env = "FIELDBOOK_BASE_URL", default_value = DEFAULT_BASE_URL, global = true)]
    base_url: String,

    /// API key (username) from the book's API-access settings
    #[arg(long, env = "FIELDBOOK_KEY", global = true)]
    key: Option<String>,

    /// API secret (password)
    #[arg(long, env = "FIELDBOOK_SECRET", hide_env_values = true, global = true)]
    secret: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List records of a sheet
    List {
        /// "<book_id>/<sheet_name>"
        query: String,

        /// Page size; 0 fetches everything at once
        #[arg(long, default_value_t = 0)]
        limit: u64,

        #[arg(long, default_value_t = 0)]
        offset: u64,

        /// Case-sensitive equality filter, repeatable
        #[arg(long = "filter", value_name = "KEY=VALUE")]
        filters: Vec<String>,

        #[command(flatten)]
        projection: ProjectionArgs,

        /// Page through every record from the start
        #[arg(long)]
        all: bool,
    },

    /// Show one record
    Get {
        query: String,
        id: RecordId,

        #[command(flatten)]
        projection: ProjectionArgs,
    },

    /// Add a record
    Add {
        query: String,

        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field, required = true)]
        fields: Vec<(String, Value)>,
    },

    /// Change some fields of a record
    Update {
        query: String,
        id: RecordId,

        #[arg(long = "field", value_name = "KEY=VALUE", value_parser = parse_field, required = true)]
        fields: Vec<(String, Value)>,
    },

    /// Delete a record
    Delete { query: String, id: RecordId },
}

#[derive(Args, Debug, Default)]
struct ProjectionArgs {
    /// Only return these fields
    #[arg(long, value_delimiter = ',')]
    include: Option<Vec<String>>,

    /// Leave out these fields
    #[arg(long, value_delimiter = ',')]
    exclude: Option<Vec<String>>,
}

impl From<ProjectionArgs> for Projection {
    fn from(args: ProjectionArgs) -> Self {
        Projection {
            include: args.include,
            exclude: args.exclude,
        }
    }
}

impl Cli {
    fn client(&self) -> Result<FieldbookClient> {
        let client = FieldbookClient::new(&self.base_url);
        match (&self.key, &self.secret) {
            (Some(key), Some(secret)) => Ok(client.with_credentials(Credentials::new(key, secret))),
            (None, None) => Ok(client),
            _ => bail!("--key and --secret must be given together"),
        }
    }
}

/// Parse `KEY=VALUE`. Values that read as JSON scalars (numbers, booleans,
/// null) keep that type; anything else is a string.
fn parse_field(arg: &str) -> Result<(String, Value), String> {
    let (key, raw) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {arg:?}"))?;
    if key.is_empty() {
        return Err(format!("empty field name in {arg:?}"));
    }
    let value = match serde_json::from_str::<Value>(raw) {
        Ok(value) if !value.is_object() && !value.is_array() && !value.is_string() => value,
        _ => Value::String(raw.to_string()),
    };
    Ok((key.to_string(), value))
}

fn print_record(record: &Record) -> Result<()> {
    println!("{}", serde_json::to_string(record)?);
    Ok(())
}

async fn run(session: &Session<UreqTransport>, command: Command) -> Result<()> {
    match command {
        Command::List {
            query,
            limit,
            offset,
            filters,
            projection,
            all,
        } => {
            let mut request = ListRequest::new(query)
                .limit(limit)
                .offset(offset)
                .projection(projection.into());
            request.filters = filters;

            if all {
                let page_size = if limit == 0 { DEFAULT_PAGE_SIZE } else { limit };
                let mut pager = Pager::new(request, page_size);
                while let Some(page) = session.next_page(&mut pager).await {
                    for record in page? {
                        print_record(&record)?;
                    }
                    debug!(loaded = pager.loaded(), "fetched page");
                }
                return Ok(());
            }

            let result = session.list(&request).await?;
            for record in &result.records {
                print_record(record)?;
            }
            if result.has_more {
                eprintln!(
                    "more records available, continue with --offset {}",
                    offset + result.records.len() as u64
                );
            }
        }
        Command::Get {
            query,
            id,
            projection,
        } => {
            let record = session.get(&query, id, &projection.into()).await?;
            print_record(&record)?;
        }
        Command::Add { query, fields } => {
            let fields: Map<String, Value> = fields.into_iter().collect();
            let record = session.create(&query, &fields).await?;
            print_record(&record)?;
        }
        Command::Update { query, id, fields } => {
            let fields: Map<String, Value> = fields.into_iter().collect();
            let record = session.update(&query, id, &fields).await?;
            print_record(&record)?;
        }
        Command::Delete { query, id } => {
            session.delete(&query, id).await?;
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let session = Session::on_current_runtime(cli.client()?, UreqTransport::new());
    run(&session, cli.command).await
}
