//! sqlshim: run SQL statements against a document store.
//!
//! # Usage
//!
//! ```bash
//! # Seed an in-memory store and query it
//! sqlshim --fixture users.json "SELECT name FROM users WHERE age >= \$1" --bind 18
//!
//! # Show how a statement translates
//! sqlshim explain "DELETE FROM sessions WHERE expires_at < NOW()"
//!
//! # Pass through to PostgreSQL
//! SQLSHIM_DATABASE_URL=postgres://localhost/app sqlshim "SELECT * FROM users"
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use colored::*;
use tracing_subscriber::EnvFilter;

use serde_json::json;
use sqlshim::case::{to_caller_case, to_store_case};
use sqlshim::config::BackendKind;
use sqlshim::prelude::*;
use sqlshim::transpiler::{build_filter, sort_direction};

#[derive(Parser)]
#[command(name = "sqlshim")]
#[command(version)]
#[command(about = "Run parameterized SQL against a document store", long_about = None)]
#[command(args_conflicts_with_subcommands = true)]
#[command(after_help = "EXAMPLES:
    sqlshim --fixture users.json 'SELECT * FROM users WHERE verified = true'
    sqlshim 'UPDATE users SET name = $1 WHERE id = $2' --bind Ann,u-1 --dry-run
    sqlshim explain 'SELECT id FROM users WHERE email LIKE $1'")]
struct Cli {
    /// Statements to execute, in order
    statements: Vec<String>,

    /// Parse and show the translation without executing
    #[arg(short, long)]
    dry_run: bool,

    /// Parameter bindings ($1, $2, etc.)
    #[arg(short, long, value_delimiter = ',')]
    bind: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    format: OutputFormat,

    /// PostgreSQL URL; statements are passed through unchanged
    #[arg(long, env = "SQLSHIM_DATABASE_URL")]
    database_url: Option<String>,

    /// JSON fixture seeding the in-memory store
    #[arg(long)]
    fixture: Option<PathBuf>,

    /// Fail on unrecognized statements
    #[arg(long)]
    strict: bool,

    /// Config file (default: ./sqlshim.toml, then the user config dir)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse a statement and show its document-store translation
    Explain {
        /// The SQL statement to explain
        statement: String,

        /// Parameter bindings used to render the filter
        #[arg(short, long, value_delimiter = ',')]
        bind: Vec<String>,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    init_tracing(&config, cli.verbose);

    if let Some(Commands::Explain { statement, bind }) = &cli.command {
        explain(statement, &parse_bindings(bind));
        return Ok(());
    }

    if cli.statements.is_empty() {
        println!("{}", "sqlshim: SQL on a document store".cyan().bold());
        println!();
        println!("Usage: sqlshim <STATEMENT>... [OPTIONS]");
        println!();
        println!("Try: sqlshim --help");
        return Ok(());
    }

    let params = parse_bindings(&cli.bind);

    if cli.dry_run {
        for statement in &cli.statements {
            explain(statement, &params);
        }
        return Ok(());
    }

    let backend = open_backend(&cli, &config).await?;
    for statement in &cli.statements {
        if cli.verbose {
            println!("{} {}", "Statement:".dimmed(), statement.yellow());
        }
        let result = backend
            .query(statement, &params)
            .await
            .with_context(|| format!("while running '{}'", statement))?;
        print_result(&result, &cli.format);
    }

    Ok(())
}

fn init_tracing(config: &Config, verbose: bool) {
    let fallback = match (&config.log_filter, verbose) {
        (Some(filter), _) => filter.clone(),
        (None, true) => "sqlshim=debug".to_string(),
        (None, false) => "warn".to_string(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn open_backend(cli: &Cli, config: &Config) -> anyhow::Result<Box<dyn QueryInterface>> {
    let database_url = cli.database_url.clone().or_else(|| match config.backend.kind {
        BackendKind::Postgres => config.backend.database_url.clone(),
        BackendKind::Memory => None,
    });

    if let Some(url) = database_url {
        if cli.verbose {
            println!("{} {}", "Connecting to:".dimmed(), url);
        }
        return Ok(Box::new(PgBackend::connect(&url).await?));
    }
    if config.backend.kind == BackendKind::Postgres {
        anyhow::bail!("backend kind is postgres but no database_url is set. Use --database-url or set SQLSHIM_DATABASE_URL");
    }

    let store = match cli.fixture.as_ref().or(config.backend.fixture.as_ref()) {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("reading fixture {}", path.display()))?;
            let fixture: serde_json::Value = serde_json::from_str(&content)
                .with_context(|| format!("parsing fixture {}", path.display()))?;
            MemoryStore::from_json(&fixture)?
        }
        None => MemoryStore::new(),
    };

    let mut translator = config.translator();
    translator.strict |= cli.strict;
    Ok(Box::new(Translator::with_config(Arc::new(store), translator)))
}

/// Numbers, `true`/`false` and `null` are typed; everything else is text.
fn parse_bindings(raw: &[String]) -> Vec<TypedValue> {
    raw.iter()
        .map(|b| {
            if let Ok(n) = b.parse::<i64>() {
                TypedValue::from(n)
            } else if let Ok(f) = b.parse::<f64>() {
                TypedValue::from(f)
            } else {
                match b.as_str() {
                    "true" => TypedValue::Bool(true),
                    "false" => TypedValue::Bool(false),
                    "null" | "NULL" => TypedValue::Null,
                    _ => TypedValue::from(b.as_str()),
                }
            }
        })
        .collect()
}

fn print_result(result: &QueryResult, format: &OutputFormat) {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(result).unwrap_or_default());
        return;
    }

    match result.command {
        CommandTag::Select | CommandTag::Passthrough if !result.rows.is_empty() => {
            print_table(&result.rows)
        }
        CommandTag::Select => println!("{}", "(no results)".dimmed()),
        CommandTag::Ignored => println!("{}", "⚠ Unsupported statement ignored".yellow()),
        CommandTag::Inert | CommandTag::AlterTable => {
            println!("{} {} (no changes)", "✓".green(), result.command)
        }
        _ => {
            if !result.rows.is_empty() {
                print_table(&result.rows);
            }
            println!("{} {}: {} row(s) affected", "✓".green(), result.command, result.row_count);
            if let Some(id) = &result.inserted_id {
                println!("  {} {}", "id:".dimmed(), id.to_string().cyan());
            }
        }
    }
}

/// Caller-case columns only; store-case aliases would duplicate them.
fn columns(rows: &[Row]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            let caller = to_caller_case(key);
            let visible = caller == *key || !row.contains(&caller);
            if visible && !columns.contains(key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn print_table(rows: &[Row]) {
    let columns = columns(rows);

    let cell = |row: &Row, col: &str| row.get(col).map(|v| v.to_string()).unwrap_or_default();
    let widths: Vec<usize> = columns
        .iter()
        .map(|c| rows.iter().map(|r| cell(r, c.as_str()).len()).fold(c.len(), usize::max))
        .collect();

    let header: Vec<String> = columns
        .iter()
        .zip(&widths)
        .map(|(c, w)| format!("{:width$}", c, width = w))
        .collect();
    println!("{}", header.join(" │ ").white().bold());

    let sep: Vec<String> = widths.iter().map(|w| "─".repeat(*w)).collect();
    println!("{}", sep.join("─┼─").dimmed());

    for row in rows {
        let cells: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:width$}", cell(row, c.as_str()), width = w))
            .collect();
        println!("{}", cells.join(" │ "));
    }

    println!();
    println!("{} row(s) returned", rows.len().to_string().cyan());
}

fn explain(statement: &str, params: &[TypedValue]) {
    println!("{} {}", "Statement:".dimmed(), statement.yellow());

    let parsed = match parse(statement) {
        Ok(parsed) => parsed,
        Err(e) => {
            eprintln!("{} {}", "Parse Error:".red().bold(), e);
            return;
        }
    };

    println!("  {} {}", "Kind:".dimmed(), parsed.kind().to_string().cyan());
    if let Some(collection) = parsed.collection() {
        println!("  {} {}", "Collection:".dimmed(), collection.white());
    }

    let (operation, predicates) = match &parsed {
        Statement::Select(s) => ("find", s.predicates.as_slice()),
        Statement::Insert(_) => ("insertOne", &[][..]),
        Statement::Update(u) => ("updateMany", u.predicates.as_slice()),
        Statement::Delete(d) => ("deleteMany", d.predicates.as_slice()),
        Statement::CreateTable(_) => ("collection exists probe", &[][..]),
        Statement::CreateIndex(_) => ("createIndex", &[][..]),
        Statement::AlterTable(_) | Statement::Inert(_) => ("none (inert)", &[][..]),
        Statement::Unsupported(_) => ("none (ignored)", &[][..]),
    };
    println!("  {} {}", "Operation:".dimmed(), operation.green());

    if let Statement::Select(select) = &parsed {
        if let Some(order) = &select.order_by {
            let sort = json!({ to_store_case(&order.field): sort_direction(order.order) });
            println!("  {} {}", "Sort:".dimmed(), sort.to_string().cyan());
        }
        if let Some(n) = select.offset {
            println!("  {} {}", "Skip:".dimmed(), n);
        }
        if let Some(n) = select.limit {
            println!("  {} {}", "Limit:".dimmed(), n);
        }
    }

    if predicates.is_empty() {
        println!();
        return;
    }

    println!("  {}", "Predicates:".dimmed());
    for predicate in predicates {
        println!("    • {}", predicate.to_string().white());
    }

    match build_filter(predicates, params) {
        Ok(filter) => {
            let rendered = serde_json::to_string(&filter.to_document()).unwrap_or_default();
            println!("  {} {}", "Filter:".dimmed(), rendered.cyan());
        }
        Err(e) => println!("  {} {}", "Filter:".dimmed(), e.to_string().dimmed()),
    }
    println!();
}
