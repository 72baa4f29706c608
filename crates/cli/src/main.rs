mod auth_commands;
mod config_commands;
mod defaults_commands;
mod publish_command;
mod qr;
mod update;

use std::path::PathBuf;

use {
    anyhow::{Context, Result},
    clap::{Parser, Subcommand},
    snaplist_config::SnaplistConfig,
    snaplist_gateway::{GatewayState, net::public_host, start_gateway},
    snaplist_listing::{DefaultsStore, ImageHost, ListingPublisher},
    snaplist_oauth::{CredentialStore, OAuthClient},
    tracing::{info, warn},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "snaplist", version, about = "snaplist: phone photos to marketplace listings")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    /// Directory holding snaplist.toml, credentials.json and defaults.json.
    #[arg(long, global = true, env = "SNAPLIST_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the upload server and show its QR code.
    Serve {
        #[arg(long)]
        bind: Option<String>,
        #[arg(long)]
        port: Option<u16>,
        /// Skip the release check on start.
        #[arg(long, default_value_t = false)]
        no_update_check: bool,
    },
    /// eBay account login and tokens.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    /// App config and eBay application credentials.
    Config {
        #[command(subcommand)]
        action: config_commands::ConfigAction,
    },
    /// Listing defaults.
    Defaults {
        #[command(subcommand)]
        action: defaults_commands::DefaultsAction,
    },
    /// Publish a listing without the web UI.
    Publish(publish_command::PublishArgs),
    /// Check for a newer release.
    Update {
        /// Open the download page when an update is available.
        #[arg(long, default_value_t = false)]
        open: bool,
    },
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true).with_thread_ids(false))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_ansi(true),
            )
            .init();
    }
}

fn http_client(config: &SnaplistConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(config.http.timeout())
        .build()
        .context("failed to build http client")
}

async fn serve(
    mut config: SnaplistConfig,
    bind: Option<String>,
    port: Option<u16>,
    no_update_check: bool,
) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    if let Some(port) = port {
        config.server.port = port;
    }
    let check_updates = config.updates.check_on_start && !no_update_check;
    let repo = config.updates.repo.clone();

    let state = GatewayState::from_config(config)?;
    let url = state.image_host.base_url();
    match qr::render(&url) {
        Ok(code) => println!("\nScan to open {url}\n\n{code}"),
        Err(e) => warn!(error = %e, "could not render QR code"),
    }

    if check_updates {
        tokio::spawn(async move {
            let http = reqwest::Client::new();
            match update::check_for_updates(&http, update::GITHUB_API, &repo, update::CURRENT_VERSION)
                .await
            {
                Some(info) if info.available => {
                    info!(latest = %info.latest_version, url = %info.download_url, "update available");
                },
                Some(_) => info!("running the latest version"),
                None => {},
            }
        });
    }

    start_gateway(state).await
}

async fn check_update(config: &SnaplistConfig, open_page: bool) -> Result<()> {
    let http = reqwest::Client::new();
    let Some(info) = update::check_for_updates(
        &http,
        update::GITHUB_API,
        &config.updates.repo,
        update::CURRENT_VERSION,
    )
    .await
    else {
        println!("Could not check for updates.");
        return Ok(());
    };

    if !info.available {
        println!("You're running the latest version ({}).", info.current_version);
        return Ok(());
    }
    println!("{}", update::notice(&info));
    if open_page && open::that(&info.download_url).is_err() {
        println!("Could not open browser. Please visit:\n{}", info.download_url);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    if let Some(dir) = &cli.config_dir {
        snaplist_config::set_config_dir(dir.clone());
    }
    let config = snaplist_config::discover_and_load();
    info!(version = env!("CARGO_PKG_VERSION"), "snaplist starting");

    match cli.command {
        Commands::Serve {
            bind,
            port,
            no_update_check,
        } => serve(config, bind, port, no_update_check).await,
        Commands::Auth { action } => {
            let oauth = OAuthClient::new(CredentialStore::new(), http_client(&config)?);
            auth_commands::handle_auth(action, &config, &oauth).await
        },
        Commands::Config { action } => {
            config_commands::handle_config(action, &config, &CredentialStore::new())
        },
        Commands::Defaults { action } => {
            defaults_commands::handle_defaults(action, &DefaultsStore::new())
        },
        Commands::Publish(args) => {
            let http = http_client(&config)?;
            let oauth = OAuthClient::new(CredentialStore::new(), http.clone());
            let publisher = ListingPublisher::new(oauth, http);
            let host = ImageHost::new(
                public_host(config.server.public_host.as_deref()),
                config.server.port,
            );
            publish_command::handle_publish(args, &DefaultsStore::new(), &host, &publisher).await
        },
        Commands::Update { open } => check_update(&config, open).await,
    }
}
