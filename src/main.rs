use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use jobsync::config::{self, Config};
use jobsync::error::SyncError;
use jobsync::fields::Lang;
use jobsync::model::{JobRecord, ParentType, RawJobRecord, WorkspaceDatabase};
use jobsync::notion::{NotionClient, WorkspaceService};
use jobsync::oauth;
use jobsync::setup::{self, SetupMode};
use jobsync::store::{keys, SettingsStore};
use jobsync::sync;

#[derive(Debug, Parser)]
#[command(author, version, about = "Sync scraped job postings into a Notion workspace")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Connect a workspace via OAuth, or store a manual integration token
    Connect {
        /// Manually issued integration token; skips the browser round trip
        #[arg(long)]
        token: Option<String>,
        /// Do not run destination setup after connecting
        #[arg(long)]
        no_setup: bool,
    },
    /// Run destination setup with the stored session
    Setup {
        /// Name for a newly created database (defaults to the catalog name)
        #[arg(long)]
        name: Option<String>,
        /// Schema language for a newly created database: zh or en
        #[arg(long)]
        lang: Option<String>,
    },
    /// List candidate parent pages
    Pages,
    /// List databases and their compatibility verdicts
    Databases {
        /// Only databases directly under this page
        #[arg(long)]
        parent: Option<String>,
    },
    /// Commit a destination database choice
    UseDatabase {
        database_id: String,
        /// Display name to store when the database is not in the candidate list
        #[arg(long)]
        name: Option<String>,
    },
    /// Upload one scraped job record (JSON file)
    Sync {
        record: PathBuf,
        /// Fallback schema language when detection is impossible
        #[arg(long)]
        lang: Option<String>,
    },
    /// Show the stored session and destination configuration
    Status {
        /// Probe the stored token against the API
        #[arg(long)]
        check: bool,
    },
    /// Forget the session and destination configuration
    Disconnect,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/jobsync.db", cfg.app.data_dir));
    let store = SettingsStore::open(&database_url).await?;
    let client = NotionClient::from_config(&cfg);

    match args.command {
        Command::Connect { token, no_setup } => connect(&cfg, &store, &client, token, no_setup).await,
        Command::Setup { name, lang } => run_setup(&cfg, &store, &client, name, lang).await,
        Command::Pages => pages(&store, &client).await,
        Command::Databases { parent } => databases(&store, &client, parent).await,
        Command::UseDatabase { database_id, name } => {
            setup::commit_database_choice(&store, &database_id, name.as_deref()).await?;
            println!("Destination set to {database_id}.");
            Ok(())
        }
        Command::Sync { record, lang } => sync_record(&cfg, &store, &client, &record, lang).await,
        Command::Status { check } => status(&store, &client, check).await,
        Command::Disconnect => {
            oauth::disconnect(&store).await?;
            println!("Disconnected; the stored session and destination were cleared.");
            Ok(())
        }
    }
}

fn parse_lang(arg: Option<&str>, cfg: &Config) -> Result<Lang> {
    match arg {
        Some(s) => s.parse::<Lang>().map_err(anyhow::Error::msg),
        None => Ok(cfg.default_lang()),
    }
}

async fn connect(
    cfg: &Config,
    store: &SettingsStore,
    client: &NotionClient,
    token: Option<String>,
    no_setup: bool,
) -> Result<()> {
    let session = match token {
        Some(token) => oauth::connect_manual(store, token.trim()).await?,
        None => {
            if cfg.oauth.client_id.trim().is_empty() {
                bail!("oauth.client_id is not configured; pass --token to use a manual integration token");
            }
            let redirect_uri = cfg.redirect_uri();
            let url = oauth::authorize_url(&cfg.oauth.client_id, &redirect_uri);
            println!("Open this URL in a browser to authorize:\n\n  {url}\n");
            println!("Waiting for the redirect on {redirect_uri} ...");
            let code = match oauth::capture_callback(cfg.oauth.redirect_port).await {
                Ok(code) => code,
                Err(SyncError::AuthorizationDenied) => {
                    // A cancelled grant is a normal outcome, not a failure.
                    println!("Authorization was cancelled; nothing was stored.");
                    return Ok(());
                }
                Err(err) => return Err(err.into()),
            };
            oauth::connect(store, client, &code, &redirect_uri).await?
        }
    };
    println!(
        "Connected workspace: {}",
        session.workspace_name.as_deref().unwrap_or("(unnamed)")
    );
    if no_setup {
        println!("Run `jobsync setup` to configure a destination database.");
        return Ok(());
    }
    run_setup(cfg, store, client, None, None).await
}

async fn run_setup(
    cfg: &Config,
    store: &SettingsStore,
    client: &NotionClient,
    name: Option<String>,
    lang: Option<String>,
) -> Result<()> {
    let lang = parse_lang(lang.as_deref(), cfg)?;
    let token = oauth::access_token(store, client).await?;
    let outcome = setup::run(client, store, &token, name.as_deref(), lang).await?;
    match (outcome.mode, &outcome.created) {
        (SetupMode::AutoCreated, Some(created)) => {
            println!("Created database {} under \"{}\".", created.id, outcome.parent.title);
            if let Some(url) = &created.url {
                println!("  {url}");
            }
        }
        _ => {
            println!(
                "Found {} database(s) under \"{}\":",
                outcome.candidates.len(),
                outcome.parent.title
            );
            print_databases(&outcome.candidates);
            println!("\nPick one with `jobsync use-database <id>`.");
        }
    }
    Ok(())
}

fn print_databases(databases: &[WorkspaceDatabase]) {
    for db in databases {
        let lang = db.compatibility.language.map(Lang::as_str).unwrap_or("-");
        println!(
            "  {}  [{}]  lang={}  {}",
            db.id,
            db.compatibility.level.as_str(),
            lang,
            db.title
        );
        if !db.compatibility.missing_fields.is_empty() {
            println!("      missing: {}", db.compatibility.missing_fields.join(", "));
        }
    }
}

async fn pages(store: &SettingsStore, client: &NotionClient) -> Result<()> {
    let token = oauth::access_token(store, client).await?;
    let pages = client.list_pages(&token).await?;
    if pages.is_empty() {
        println!("No pages are shared with the integration.");
        return Ok(());
    }
    for page in &pages {
        let marker = match page.parent_type {
            ParentType::Workspace => "workspace",
            ParentType::PageId => "sub-page",
            _ => "other",
        };
        println!(
            "  {}  [{}]  {}  (edited {})",
            page.id,
            marker,
            page.title,
            page.last_edited_time.format("%Y-%m-%d")
        );
    }
    Ok(())
}

async fn databases(
    store: &SettingsStore,
    client: &NotionClient,
    parent: Option<String>,
) -> Result<()> {
    let token = oauth::access_token(store, client).await?;
    let databases = client.list_databases(&token, parent.as_deref()).await?;
    if databases.is_empty() {
        println!("No databases found.");
        return Ok(());
    }
    print_databases(&databases);
    Ok(())
}

async fn sync_record(
    cfg: &Config,
    store: &SettingsStore,
    client: &NotionClient,
    record_path: &Path,
    lang: Option<String>,
) -> Result<()> {
    let requested = parse_lang(lang.as_deref(), cfg)?;
    // Refresh first so the config snapshot carries a live token.
    oauth::access_token(store, client).await?;
    let config = store
        .sync_config()
        .await?
        .context("not connected; run `jobsync connect` first")?;

    let content = std::fs::read_to_string(record_path)
        .with_context(|| format!("cannot read job record {}", record_path.display()))?;
    let raw: RawJobRecord = serde_json::from_str(&content)
        .with_context(|| format!("unreadable job record {}", record_path.display()))?;
    let record = JobRecord::from(raw);

    let page = sync::upload(client, &record, &config, requested).await?;
    match page.url {
        Some(url) => println!("Synced: {url}"),
        None => println!("Synced: page {}", page.id),
    }
    Ok(())
}

async fn status(store: &SettingsStore, client: &NotionClient, check: bool) -> Result<()> {
    match store.auth_session().await? {
        None => {
            println!("Not connected.");
            return Ok(());
        }
        Some(session) => {
            println!("Connected ({})", session.auth_method.as_str());
            if let Some(name) = &session.workspace_name {
                println!("  workspace: {name}");
            }
            if let Some(id) = &session.workspace_id {
                println!("  workspace id: {id}");
            }
            match session.expires_at {
                Some(at) => println!("  token expires: {}", at.format("%Y-%m-%d %H:%M:%S UTC")),
                None => println!("  token expires: never"),
            }
            if check {
                let token = oauth::access_token(store, client).await?;
                let user = client.current_user(&token).await?;
                println!("  token check: ok (bot user {})", user.name.unwrap_or(user.id));
            }
        }
    }

    if let Some(config) = store.sync_config().await? {
        match &config.database_id {
            Some(id) => {
                match &config.database_name {
                    Some(name) => println!("Destination: {id} ({name})"),
                    None => println!("Destination: {id}"),
                }
                if let Some(at) = store.updated_at(keys::DATABASE_ID).await? {
                    println!("  configured: {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
                }
            }
            None => {
                let candidates = store.available_databases().await?;
                if candidates.is_empty() {
                    println!("No destination database configured; run `jobsync setup`.");
                } else {
                    println!("Destination pending; {} candidate(s) stored:", candidates.len());
                    print_databases(&candidates);
                    println!("Pick one with `jobsync use-database <id>`.");
                }
            }
        }
        if let Some(parent) = &config.selected_parent_page_id {
            println!("  parent page: {parent}");
        }
    }
    Ok(())
}
