use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{bail, Context};
use clap::Parser;
use grippy_core::{
    config::BackendKind, search::request_page, AddOutcome, Config, ListOutcome, RemoveOutcome,
    Services, SessionStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "grippy")]
#[command(version, about = "Search Giphy and keep your favorite GIFs", long_about = None)]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Favorites and accounts backend (local or firebase)
    #[arg(long, global = true, env = "GRIPPY_BACKEND")]
    backend: Option<BackendKind>,

    #[arg(long, global = true, env = "GRIPPY_GIPHY_API_KEY", hide_env_values = true)]
    giphy_api_key: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Search Giphy
    Search {
        term: String,
        /// Page to show, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
        /// Print results as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in and remember the session
    Login {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GRIPPY_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and log in
    Signup {
        #[arg(long)]
        email: String,
        #[arg(long, env = "GRIPPY_PASSWORD", hide_env_values = true)]
        password: String,
        /// Repeat the password
        #[arg(long)]
        confirm: String,
    },
    /// Forget the stored session
    Logout,
    /// Manage saved GIFs
    Favorites {
        #[command(subcommand)]
        action: FavoritesAction,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand)]
enum FavoritesAction {
    /// List saved GIFs
    List {
        #[arg(long)]
        json: bool,
    },
    /// Save a GIF URL
    Add { url: String },
    /// Remove a saved GIF by id
    Remove { id: String },
}

#[derive(clap::Subcommand)]
enum ConfigAction {
    /// Print the effective config
    Show,
    /// Write a default config file if there is none
    Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The TUI owns the terminal, so its logs go to a file
    let tui_mode = cli.command.is_none();
    let log_file = if tui_mode {
        Config::data_dir().ok().map(|dir| dir.join("grippy.log"))
    } else {
        None
    };
    init_logging(tui_mode, log_file.as_deref());

    let config_path = match &cli.config {
        Some(path) => path.clone(),
        None => Config::config_path()?,
    };
    let mut config = Config::load_from(&config_path)
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    apply_overrides(&mut config, &cli);

    match cli.command {
        None => run_tui(&config).await,
        Some(Commands::Config { action }) => run_config(action, &config, &config_path),
        Some(Commands::Search { term, page, json }) => run_search(&config, &term, page, json).await,
        Some(Commands::Login { email, password }) => {
            let (services, store) = connect(&config).await?;
            let session = services.auth.login(&email, &password).await?;
            store.save(&session)?;
            println!("Logged in as {}", session.email);
            Ok(())
        }
        Some(Commands::Signup {
            email,
            password,
            confirm,
        }) => {
            let (services, store) = connect(&config).await?;
            let session = services.auth.signup(&email, &password, &confirm).await?;
            store.save(&session)?;
            println!("Account created, logged in as {}", session.email);
            Ok(())
        }
        Some(Commands::Logout) => {
            let (services, store) = connect(&config).await?;
            services.auth.logout().await;
            store.clear()?;
            println!("Logged out");
            Ok(())
        }
        Some(Commands::Favorites { action }) => run_favorites(action, &config).await,
    }
}

fn init_logging(tui_mode: bool, log_file: Option<&Path>) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "grippy=info".into());
    let registry = tracing_subscriber::registry().with(filter);

    if !tui_mode {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        return;
    }

    let file = log_file.and_then(|path| {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).ok()?;
        }
        OpenOptions::new().create(true).append(true).open(path).ok()
    });

    match file {
        Some(file) => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(Mutex::new(file))
                    .with_ansi(false),
            )
            .init(),
        // Nowhere safe to write while the TUI is up
        None => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::sink))
            .init(),
    }
}

/// CLI > Env > File > Defaults; clap has already merged the first two
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(kind) = cli.backend {
        config.backend.kind = kind;
    }
    if let Some(key) = &cli.giphy_api_key {
        config.giphy.api_key = Some(key.clone());
    }
}

/// Services with the persisted session, if any, already published
async fn connect(config: &Config) -> anyhow::Result<(Services, SessionStore)> {
    let services = Services::from_config(config)?;
    let store = SessionStore::open_default()?;

    if let Some(session) = store.load()? {
        tracing::debug!("Restoring session for {}", session.email);
        let restored = services.auth.restore(session).await;
        sync_session(&services, &store, restored)?;
    }

    Ok((services, store))
}

/// Write back whatever session is current; a refresh may have replaced it
fn sync_session(services: &Services, store: &SessionStore, signed_in: bool) -> anyhow::Result<()> {
    match services.sessions.current() {
        Some(session) if signed_in => store.save(&session)?,
        _ => store.clear()?,
    }
    Ok(())
}

async fn run_tui(config: &Config) -> anyhow::Result<()> {
    let (services, store) = connect(config).await?;
    let app = grippy_tui::App::new(services.debounce_window);
    grippy_tui::run_tui(app, services, Some(store), config.ui.mouse_enabled).await
}

async fn run_search(config: &Config, term: &str, page: u32, json: bool) -> anyhow::Result<()> {
    if term.trim().is_empty() {
        bail!("Search term cannot be empty");
    }
    if page == 0 {
        bail!("Pages start at 1");
    }

    let services = Services::from_config(config)?;
    tracing::info!("Searching for: {}", term);
    let results = services.search.try_search(term, request_page(page)).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results.items)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("No GIFs found for '{}'", term);
        return Ok(());
    }

    for (i, gif) in results.items.iter().enumerate() {
        let number = results.cursor.offset as usize + i + 1;
        let title = if gif.title.trim().is_empty() { &gif.id } else { &gif.title };
        println!("{:>4}. {}", number, title);
        println!("      {}", gif.preview_url);
    }
    println!(
        "\nPage {}/{} ({} results)",
        results.cursor.current_page(),
        results.cursor.page_count(),
        results.cursor.total_count
    );
    Ok(())
}

async fn run_favorites(action: FavoritesAction, config: &Config) -> anyhow::Result<()> {
    let (services, store) = connect(config).await?;
    let result = favorites_action(action, &services).await;
    sync_session(&services, &store, services.sessions.is_authenticated())?;
    result
}

async fn favorites_action(action: FavoritesAction, services: &Services) -> anyhow::Result<()> {
    let not_logged_in = "Not logged in. Run `grippy login` first.";

    match action {
        FavoritesAction::List { json } => match services.favorites.list().await? {
            ListOutcome::Denied => bail!(not_logged_in),
            ListOutcome::Items(items) if json => {
                println!("{}", serde_json::to_string_pretty(&items)?);
            }
            ListOutcome::Items(items) if items.is_empty() => println!("No favorites yet"),
            ListOutcome::Items(items) => {
                for item in items {
                    println!("{}  {}", item.id, item.url);
                }
            }
        },
        FavoritesAction::Add { url } => match services.favorites.add(&url).await? {
            AddOutcome::Denied => bail!(not_logged_in),
            outcome @ AddOutcome::Added(_) => {
                if let AddOutcome::Added(item) = &outcome {
                    println!("{} id: {}", outcome.message(), item.id);
                }
            }
            outcome => println!("{}", outcome.message()),
        },
        FavoritesAction::Remove { id } => match services.favorites.remove(&id).await? {
            RemoveOutcome::Denied => bail!(not_logged_in),
            outcome => println!("{}", outcome.message()),
        },
    }
    Ok(())
}

fn run_config(action: ConfigAction, config: &Config, path: &Path) -> anyhow::Result<()> {
    match action {
        ConfigAction::Show => {
            let mut shown = config.clone();
            // Never echo secrets
            if shown.giphy.api_key.is_some() {
                shown.giphy.api_key = Some("********".into());
            }
            if shown.backend.firebase.api_key.is_some() {
                shown.backend.firebase.api_key = Some("********".into());
            }
            println!("# {}", path.display());
            print!("{}", toml::to_string_pretty(&shown)?);
        }
        ConfigAction::Init => {
            if path.exists() {
                println!("Config already exists at {}", path.display());
            } else {
                Config::default().save_to(path)?;
                println!("Wrote default config to {}", path.display());
            }
        }
    }
    Ok(())
}
