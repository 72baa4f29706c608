use {
    anyhow::Result,
    clap::Subcommand,
    snaplist_config::{SnaplistConfig, config_file_path, update_config},
    snaplist_oauth::{CredentialRecord, CredentialStore, Environment},
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the app config and account (secrets masked).
    Show,
    /// Set eBay application credentials and the redirect URI.
    Set {
        #[arg(long)]
        app_id: Option<String>,
        #[arg(long)]
        dev_id: Option<String>,
        #[arg(long)]
        cert_id: Option<String>,
        /// `sandbox` or `production`. Switching discards stored tokens.
        #[arg(long)]
        environment: Option<Environment>,
        /// Redirect URI (RuName) used by `auth login` and the web UI.
        #[arg(long)]
        redirect_uri: Option<String>,
    },
}

pub fn handle_config(
    action: ConfigAction,
    config: &SnaplistConfig,
    store: &CredentialStore,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", show(config, &store.load()));
            Ok(())
        },
        ConfigAction::Set {
            app_id,
            dev_id,
            cert_id,
            environment,
            redirect_uri,
        } => {
            let record = store.update(|r| {
                let app_id = app_id.unwrap_or_else(|| r.app_id.clone());
                let dev_id = dev_id.unwrap_or_else(|| r.dev_id.clone());
                let cert_id = cert_id.unwrap_or_else(|| r.cert_id.clone());
                let environment = environment.unwrap_or(r.environment);
                r.set_app_credentials(app_id, dev_id, cert_id, environment);
            })?;
            println!("Credentials saved to {}", store.path().display());

            if let Some(uri) = redirect_uri {
                let path = update_config(|c| c.oauth.redirect_uri = Some(uri))?;
                println!("Redirect URI saved to {}", path.display());
            }
            if !record.is_configured() {
                println!("Still missing: app id, dev id and cert id are all required.");
            }
            Ok(())
        },
    }
}

fn mask(secret: &str) -> String {
    match secret.chars().count() {
        0 => "(unset)".into(),
        n if n <= 4 => "****".into(),
        n => {
            let tail: String = secret.chars().skip(n - 4).collect();
            format!("****{tail}")
        },
    }
}

fn show(config: &SnaplistConfig, record: &CredentialRecord) -> String {
    let or_unset = |s: &str| if s.is_empty() { "(unset)".to_string() } else { s.to_string() };
    let server = &config.server;
    [
        format!("config file:   {}", config_file_path().display()),
        format!("listen:        {}:{}", server.bind, server.port),
        format!("uploads:       {}", server.uploads_dir.display()),
        format!("max upload:    {} bytes", server.max_upload_bytes),
        format!(
            "public host:   {}",
            server.public_host.as_deref().unwrap_or("(auto-detect)")
        ),
        format!("http timeout:  {}s", config.http.timeout().as_secs()),
        format!(
            "redirect uri:  {}",
            config.oauth.redirect_uri.as_deref().unwrap_or("(unset)")
        ),
        format!("environment:   {}", record.environment),
        format!("app id:        {}", or_unset(&record.app_id)),
        format!("dev id:        {}", or_unset(&record.dev_id)),
        format!("cert id:       {}", mask(&record.cert_id)),
        format!("logged in:     {}", record.is_authenticated()),
    ]
    .join("\n")
}
