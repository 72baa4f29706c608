use std::io::{self, BufRead, Write};

use {
    anyhow::{Context, Result, bail},
    clap::Subcommand,
    snaplist_config::SnaplistConfig,
    snaplist_oauth::{CredentialRecord, OAuthClient},
    url::Url,
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Log in to eBay in the browser.
    ///
    /// Paste the full redirect URL so its `state` is checked against the one
    /// issued here. A bare code carries no state and skips that CSRF check.
    Login {
        /// Redirect URI (RuName) registered for the application.
        #[arg(long)]
        redirect_uri: Option<String>,
    },
    /// Show whether the account is configured and logged in.
    Status,
    /// Refresh the access token now.
    Refresh,
    /// Forget stored tokens, keeping the application credentials.
    Logout,
}

pub async fn handle_auth(
    action: AuthAction,
    config: &SnaplistConfig,
    oauth: &OAuthClient,
) -> Result<()> {
    match action {
        AuthAction::Login { redirect_uri } => {
            let redirect_uri = redirect_uri
                .or_else(|| config.oauth.redirect_uri.clone())
                .context("no redirect URI, pass --redirect-uri or set oauth.redirect_uri")?;
            login(oauth, &redirect_uri).await
        },
        AuthAction::Status => {
            println!("{}", describe(&oauth.store().load(), now_secs()));
            Ok(())
        },
        AuthAction::Refresh => refresh(oauth).await,
        AuthAction::Logout => {
            oauth.store().update(CredentialRecord::clear_tokens)?;
            println!("Logged out.");
            Ok(())
        },
    }
}

async fn login(oauth: &OAuthClient, redirect_uri: &str) -> Result<()> {
    let auth_url = oauth.build_authorization_url(redirect_uri)?;

    println!("Opening browser for authentication...");
    if open::that(&auth_url).is_err() {
        println!("Could not open browser. Please visit:\n{auth_url}");
    }

    print!("\nPaste the URL you were redirected to (or just the code): ");
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;

    let (code, state) = match parse_redirect(&input)? {
        Pasted::Redirect { code, state } => (code, state),
        Pasted::BareCode(code) => {
            println!("No redirect URL pasted, so the login state cannot be verified.");
            let issued = oauth.store().load().oauth_state.unwrap_or_default();
            (code, issued)
        },
    };

    println!("Exchanging code for tokens...");
    oauth
        .exchange_code_for_token(&code, &state, redirect_uri)
        .await?;
    println!("Successfully logged in.");
    Ok(())
}

/// What the operator pasted after logging in.
#[derive(Debug, PartialEq, Eq)]
enum Pasted {
    /// A redirect URL; `state` is empty when the URL had none.
    Redirect { code: String, state: String },
    /// Only the code, with no state to verify.
    BareCode(String),
}

fn parse_redirect(input: &str) -> Result<Pasted> {
    let input = input.trim();
    if input.is_empty() {
        bail!("no code entered");
    }

    let Ok(url) = Url::parse(input) else {
        return Ok(Pasted::BareCode(input.to_string()));
    };
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };
    let code = param("code").context("the pasted URL has no code parameter")?;
    let state = param("state").unwrap_or_default();
    Ok(Pasted::Redirect { code, state })
}

async fn refresh(oauth: &OAuthClient) -> Result<()> {
    if oauth.refresh_access_token().await? {
        println!("Access token refreshed.");
    } else {
        bail!("refresh was rejected, run `snaplist auth login` again");
    }
    Ok(())
}

fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}

fn describe(record: &CredentialRecord, now: u64) -> String {
    if !record.is_configured() {
        return "Not configured. Run `snaplist config set` first.".into();
    }
    if !record.is_authenticated() {
        return format!("{} [not logged in]", record.environment);
    }
    let expiry = record.token_expires_at.map_or("unknown".to_string(), |ts| {
        if ts > now {
            let remaining = ts - now;
            let hours = remaining / 3600;
            let mins = (remaining % 3600) / 60;
            format!("valid ({hours}h {mins}m remaining)")
        } else if record.stored_refresh_token().is_some() {
            "expired, will refresh".to_string()
        } else {
            "expired".to_string()
        }
    });
    format!("{} [{expiry}]", record.environment)
}

#[cfg(test)]
mod tests {
    use {super::*, snaplist_oauth::Environment};

    #[test]
    fn pasted_url_carries_code_and_state() {
        let pasted = parse_redirect(
            "https://localhost/ebay/callback?code=v%5E1.1%23abc&state=s123&expires_in=299\n",
        )
        .unwrap();
        assert_eq!(pasted, Pasted::Redirect {
            code: "v^1.1#abc".into(),
            state: "s123".into(),
        });
    }

    #[test]
    fn url_without_state_keeps_state_empty() {
        let pasted = parse_redirect("https://localhost/cb?code=abc").unwrap();
        assert_eq!(pasted, Pasted::Redirect {
            code: "abc".into(),
            state: String::new(),
        });
    }

    #[test]
    fn bare_code_is_marked_unverified() {
        assert_eq!(
            parse_redirect("  v^1.1#abc  ").unwrap(),
            Pasted::BareCode("v^1.1#abc".into())
        );
    }

    #[test]
    fn url_without_code_is_rejected() {
        assert!(parse_redirect("https://localhost/cb?error=access_denied").is_err());
        assert!(parse_redirect("   ").is_err());
    }

    #[test]
    fn status_lines() {
        let configured = CredentialRecord {
            app_id: "a".into(),
            dev_id: "d".into(),
            cert_id: "c".into(),
            environment: Environment::Production,
            ..Default::default()
        };
        assert!(describe(&CredentialRecord::default(), 0).starts_with("Not configured"));
        assert_eq!(describe(&configured, 0), "production [not logged in]");

        let logged_in = CredentialRecord {
            user_token: Some("t".into()),
            token_expires_at: Some(1_000 + 2 * 3600 + 5 * 60),
            ..configured.clone()
        };
        assert_eq!(
            describe(&logged_in, 1_000),
            "production [valid (2h 5m remaining)]"
        );
        assert_eq!(describe(&logged_in, 100_000), "production [expired]");
    }
}
