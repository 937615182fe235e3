//! Integrations command - manage stored third-party API credentials
//!
//! Secrets are taken from environment variables named on the command line,
//! never from flag values, so tokens stay out of shell history. `show`
//! prints presence and plain identifiers only.

use anyhow::{Context, Result, bail};
use autopromo_adapters::sqlite::{self, SqliteConfigStore};
use autopromo_domain::{
    ConfigStore, FacebookCredentials, InstagramCredentials, IntegrationConfig,
    MarketplaceCredentials, PinterestCredentials,
};
use secrecy::SecretString;
use std::path::PathBuf;

use crate::args::{IntegrationsArgs, IntegrationsCommands, IntegrationsSetArgs};
use crate::config::AppConfig;

pub async fn execute(args: IntegrationsArgs, config_path: Option<PathBuf>) -> Result<()> {
    let config = AppConfig::load(config_path.as_deref())?;
    let pool = sqlite::connect(&config.general.state_db_path)
        .await
        .context("Failed to open state database")?;
    let store = SqliteConfigStore::new(pool);
    let admin_id = &config.general.admin_id;

    match args.command {
        IntegrationsCommands::Show { json } => show(&store, admin_id, json).await,
        IntegrationsCommands::Set(set_args) => set(&store, admin_id, set_args).await,
    }
}

async fn show(store: &SqliteConfigStore, admin_id: &str, json: bool) -> Result<()> {
    let config = store.integration_config(admin_id).await?;

    if json {
        let output = serde_json::json!({
            "marketplace": config.marketplace.as_ref().map(|m| serde_json::json!({
                "api_host": m.api_host,
                "affiliate_tag": m.affiliate_tag,
            })),
            "instagram": config.instagram.as_ref().map(|c| serde_json::json!({
                "user_id": c.user_id,
            })),
            "facebook": config.facebook.as_ref().map(|c| serde_json::json!({
                "page_id": c.page_id,
            })),
            "pinterest": config.pinterest.as_ref().map(|c| serde_json::json!({
                "board_id": c.board_id,
            })),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        print_integrations(&config);
    }

    Ok(())
}

async fn set(store: &SqliteConfigStore, admin_id: &str, args: IntegrationsSetArgs) -> Result<()> {
    let no_flags = args.rapidapi_key_env.is_none()
        && args.rapidapi_host.is_none()
        && args.affiliate_tag.is_none()
        && args.instagram_token_env.is_none()
        && args.instagram_user_id.is_none()
        && args.facebook_token_env.is_none()
        && args.facebook_page_id.is_none()
        && args.pinterest_token_env.is_none()
        && args.pinterest_board_id.is_none();
    if no_flags {
        bail!("Nothing to update; pass at least one credential flag");
    }

    let mut config = store.integration_config(admin_id).await?;

    config.marketplace = merge_marketplace(config.marketplace.take(), &args)?;

    config.instagram = merge_credentials(
        config.instagram.take().map(|c| (c.access_token, c.user_id)),
        args.instagram_token_env.as_deref(),
        args.instagram_user_id.clone(),
        "instagram",
        "--instagram-token-env",
        "--instagram-user-id",
    )?
    .map(|(access_token, user_id)| InstagramCredentials {
        access_token,
        user_id,
    });

    config.facebook = merge_credentials(
        config.facebook.take().map(|c| (c.access_token, c.page_id)),
        args.facebook_token_env.as_deref(),
        args.facebook_page_id.clone(),
        "facebook",
        "--facebook-token-env",
        "--facebook-page-id",
    )?
    .map(|(access_token, page_id)| FacebookCredentials {
        access_token,
        page_id,
    });

    config.pinterest = merge_credentials(
        config.pinterest.take().map(|c| (c.access_token, c.board_id)),
        args.pinterest_token_env.as_deref(),
        args.pinterest_board_id.clone(),
        "pinterest",
        "--pinterest-token-env",
        "--pinterest-board-id",
    )?
    .map(|(access_token, board_id)| PinterestCredentials {
        access_token,
        board_id,
    });

    store.update_integration_config(admin_id, &config).await?;

    println!("Credentials updated.");
    println!();
    print_integrations(&config);

    Ok(())
}

fn merge_marketplace(
    current: Option<MarketplaceCredentials>,
    args: &IntegrationsSetArgs,
) -> Result<Option<MarketplaceCredentials>> {
    if args.rapidapi_key_env.is_none()
        && args.rapidapi_host.is_none()
        && args.affiliate_tag.is_none()
    {
        return Ok(current);
    }

    let api_key = match &args.rapidapi_key_env {
        Some(var) => read_secret_env(var, "RapidAPI key")?,
        None => current
            .as_ref()
            .map(|m| m.api_key.clone())
            .ok_or_else(|| anyhow::anyhow!("A RapidAPI key is required; pass --rapidapi-key-env"))?,
    };

    let api_host = args
        .rapidapi_host
        .clone()
        .or_else(|| current.as_ref().map(|m| m.api_host.clone()))
        .unwrap_or_else(|| MarketplaceCredentials::DEFAULT_HOST.to_string());

    let affiliate_tag = match &args.affiliate_tag {
        Some(tag) if tag.is_empty() => None,
        Some(tag) => Some(tag.clone()),
        None => current.as_ref().and_then(|m| m.affiliate_tag.clone()),
    };

    Ok(Some(MarketplaceCredentials {
        api_key,
        api_host,
        affiliate_tag,
    }))
}

/// Merge one platform's (token, account id) pair with the stored value.
///
/// Creating a credential from nothing needs both parts; updating keeps
/// whichever part was not passed.
fn merge_credentials(
    current: Option<(SecretString, String)>,
    token_env: Option<&str>,
    account_id: Option<String>,
    platform: &str,
    token_flag: &str,
    id_flag: &str,
) -> Result<Option<(SecretString, String)>> {
    if token_env.is_none() && account_id.is_none() {
        return Ok(current);
    }

    let access_token = match token_env {
        Some(var) => read_secret_env(var, platform)?,
        None => current
            .as_ref()
            .map(|(token, _)| token.clone())
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "An access token is required to configure {}; pass {}",
                    platform,
                    token_flag
                )
            })?,
    };

    let id = match account_id {
        Some(id) => id,
        None => current.map(|(_, id)| id).ok_or_else(|| {
            anyhow::anyhow!(
                "An account ID is required to configure {}; pass {}",
                platform,
                id_flag
            )
        })?,
    };

    Ok(Some((access_token, id)))
}

fn read_secret_env(env_var: &str, what: &str) -> Result<SecretString> {
    if env_var.trim().is_empty() {
        bail!("Empty environment variable name for {}", what);
    }

    let value = std::env::var(env_var)
        .with_context(|| format!("Missing environment variable {} for {}", env_var, what))?;

    if value.trim().is_empty() {
        bail!("Environment variable {} is empty for {}", env_var, what);
    }

    Ok(SecretString::new(value.into()))
}

fn print_integrations(config: &IntegrationConfig) {
    println!("Integrations");
    println!("============");

    match &config.marketplace {
        Some(m) => println!(
            "✓ marketplace: key stored (host: {}, affiliate tag: {})",
            m.api_host,
            m.affiliate_tag.as_deref().unwrap_or("-")
        ),
        None => println!("✗ marketplace: not configured"),
    }

    match &config.instagram {
        Some(c) => println!("✓ instagram:   token stored (user: {})", c.user_id),
        None => println!("✗ instagram:   not configured"),
    }

    match &config.facebook {
        Some(c) => println!("✓ facebook:    token stored (page: {})", c.page_id),
        None => println!("✗ facebook:    not configured"),
    }

    match &config.pinterest {
        Some(c) => println!("✓ pinterest:   token stored (board: {})", c.board_id),
        None => println!("✗ pinterest:   not configured"),
    }
}
