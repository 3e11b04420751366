//! Purpose: `folio` CLI entry point and command dispatch.
//! Role: Binary crate root; parses args, runs session operations, emits JSON.
//! Invariants: Results are emitted as pretty JSON on stdout.
//! Invariants: Errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
#![allow(clippy::result_large_err)]

use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::aot::Shell;
use serde_json::{Value, json};
use std::io;
use tracing_subscriber::EnvFilter;

use folio::api::{
    DbSession, Error, ErrorKind, Filter, HttpClient, Side, Transport, to_exit_code,
};

fn main() {
    init_tracing();
    let exit_code = match run() {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run() -> Result<(), Error> {
    let cli = Cli::parse();

    if let Command::Completion { shell } = &cli.command {
        let mut cmd = Cli::command();
        clap_complete::aot::generate(*shell, &mut cmd, "folio", &mut io::stdout());
        return Ok(());
    }

    let client = build_client(&cli)?;
    let mut session = DbSession::new(client);
    dispatch_command(cli.command, &mut session)
}

fn build_client(cli: &Cli) -> Result<HttpClient, Error> {
    let url = cli
        .url
        .clone()
        .or_else(|| std::env::var("FOLIO_URL").ok())
        .ok_or_else(|| {
            Error::new(ErrorKind::Usage)
                .with_message("no remote url configured")
                .with_hint("Pass --url or set FOLIO_URL.")
        })?;
    let mut client = HttpClient::new(url)?;
    let token = cli
        .token
        .clone()
        .or_else(|| std::env::var("FOLIO_TOKEN").ok());
    if let Some(token) = token {
        client = client.with_token(token);
    }
    if let Some(ca) = &cli.tls_ca {
        client = client.with_tls_ca_file(ca)?;
    }
    if cli.insecure_skip_verify {
        client = client.with_tls_skip_verify();
    }
    Ok(client)
}

fn dispatch_command<T: Transport>(
    command: Command,
    session: &mut DbSession<T>,
) -> Result<(), Error> {
    match command {
        Command::Completion { .. } => Ok(()),
        Command::Dbs => {
            session.refresh_listing()?;
            emit_json(json!({ "databases": session.listing() }));
            Ok(())
        }
        Command::Roles => {
            session.refresh_roles()?;
            emit_json(json!({ "roles": session.roles() }));
            Ok(())
        }
        Command::CreateDb {
            database,
            collection,
        } => {
            session.create_database(&database, &collection)?;
            emit_json(json!({ "databases": session.listing() }));
            Ok(())
        }
        Command::DropDb { database } => {
            session.drop_database(&database)?;
            emit_json(json!({ "databases": session.listing() }));
            Ok(())
        }
        Command::CreateCollection {
            database,
            collection,
        } => {
            session.create_collection(&database, &collection)?;
            emit_json(json!({ "databases": session.listing() }));
            Ok(())
        }
        Command::Page {
            database,
            collection,
            side,
            from,
        } => {
            if let Some(page) = from {
                session.set_cursor(&database, &collection, page);
            }
            let documents = session.find_documents_in_page(&database, &collection, side.into())?;
            let next = session.cursors().cursor(&database, &collection);
            emit_json(json!({ "documents": documents, "next_page": next }));
            Ok(())
        }
        Command::Find {
            database,
            collection,
            filter,
        } => {
            let filter = parse_filter(filter.as_deref())?;
            let documents = session.find_documents(&database, &collection, &filter)?;
            emit_json(json!({ "documents": documents }));
            Ok(())
        }
    }
}

fn parse_filter(raw: Option<&str>) -> Result<Filter, Error> {
    let Some(raw) = raw else {
        return Ok(Filter::new());
    };
    let value: Value = serde_json::from_str(raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("filter must be a JSON object")
            .with_hint(r#"Example: --filter '{"status": "open"}'"#)
            .with_source(err)
    })?;
    let Value::Object(map) = value else {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("filter must be a JSON object")
            .with_hint(r#"Example: --filter '{"status": "open"}'"#));
    };
    Ok(map.into_iter().collect())
}

fn emit_json(value: Value) {
    let rendered =
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| "{}".to_string());
    println!("{rendered}");
}

fn emit_error(err: &Error) {
    let payload = json!({
        "error": {
            "kind": format!("{:?}", err.kind()),
            "message": err.message(),
            "hint": err.hint(),
            "database": err.database(),
            "collection": err.collection(),
        }
    });
    eprintln!("{payload}");
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

#[derive(Parser)]
#[command(
    name = "folio",
    version,
    about = "Browse and mutate document databases over a remote API",
    long_about = None
)]
struct Cli {
    /// Base URL of the remote API (falls back to FOLIO_URL).
    #[arg(long, global = true)]
    url: Option<String>,

    /// Bearer token for the remote API (falls back to FOLIO_TOKEN).
    #[arg(long, global = true)]
    token: Option<String>,

    /// Extra CA/certificate file for TLS verification.
    #[arg(long, global = true, value_name = "FILE")]
    tls_ca: Option<std::path::PathBuf>,

    /// Skip TLS certificate verification. Testing only.
    #[arg(long, global = true)]
    insecure_skip_verify: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List known databases, split into non-empty and empty groups.
    Dbs,
    /// Show the caller's role assignments per database.
    Roles,
    /// Register a new empty database seeded with one collection.
    CreateDb { database: String, collection: String },
    /// Drop a database.
    DropDb { database: String },
    /// Create a collection in an existing database.
    CreateCollection { database: String, collection: String },
    /// Load one page of documents in a scroll direction.
    Page {
        database: String,
        collection: String,
        /// Direction of the load.
        #[arg(long, value_enum, default_value = "end")]
        side: SideArg,
        /// Start from this page instead of page 0.
        #[arg(long, value_name = "PAGE")]
        from: Option<u64>,
    },
    /// Find documents matching a field/value filter.
    Find {
        database: String,
        collection: String,
        /// JSON object mapping field names to match values.
        #[arg(long)]
        filter: Option<String>,
    },
    /// Generate shell completions.
    Completion {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SideArg {
    End,
    Start,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::End => Side::End,
            SideArg::Start => Side::Start,
        }
    }
}
