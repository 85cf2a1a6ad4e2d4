//! Configuration management commands.

use anyhow::{bail, Result};
use storefront_state::StorefrontConfig;

use super::{ConfigArgs, ConfigCommand};
use crate::context::Context;

/// Run the config command.
pub async fn run(args: ConfigArgs, ctx: &Context) -> Result<()> {
    match args.command {
        ConfigCommand::Show => show_config(ctx),
        ConfigCommand::Get { key } => get_config(&key, ctx),
        ConfigCommand::Set { key, value } => set_config(&key, &value, ctx),
        ConfigCommand::Init { force } => init_config(force, ctx),
        ConfigCommand::Validate => validate_config(ctx),
    }
}

fn show_config(ctx: &Context) -> Result<()> {
    if ctx.output.is_json() {
        ctx.output.json(&ctx.config);
        return Ok(());
    }

    ctx.output.header("Current Configuration");
    match &ctx.config_path {
        Some(path) => ctx.output.kv("file", &path.display().to_string()),
        None => ctx.output.kv("file", "(defaults)"),
    }

    let config = &ctx.config;
    ctx.output.info("[backend]");
    ctx.output.kv("url", &config.backend.url);
    ctx.output.kv(
        "publishable_key",
        if config.backend.publishable_key.is_some() { "(set)" } else { "(none)" },
    );
    ctx.output.kv("timeout_secs", &config.backend.timeout_secs.to_string());
    ctx.output.kv("max_retries", &config.backend.max_retries.to_string());

    ctx.output.info("[store]");
    ctx.output.kv("region_id", &config.store.region_id);
    ctx.output.kv("locale", config.store.locale.code());

    ctx.output.info("[cookies]");
    ctx.output.kv("cart_cookie", &config.cookies.cart_cookie);
    ctx.output.kv("cart_max_age_days", &config.cookies.cart_max_age_days.to_string());
    ctx.output.kv("auth_cookie", &config.cookies.auth_cookie);

    Ok(())
}

fn get_config(key: &str, ctx: &Context) -> Result<()> {
    let value = get_config_value(&ctx.config, key)?;

    if ctx.output.is_json() {
        ctx.output.json(&serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{}", value);
    }

    Ok(())
}

fn set_config(key: &str, value: &str, ctx: &Context) -> Result<()> {
    let Some(path) = ctx.config_path.clone() else {
        bail!("No config file found. Run `storefront config init` to create one.");
    };

    // Reload without environment overrides so they are not persisted.
    let mut config = StorefrontConfig::load(&path)?;
    set_config_value(&mut config, key, value)?;
    config.validate()?;
    config.save(&path)?;

    ctx.output.success(&format!("Set {} = {}", key, value));
    Ok(())
}

fn init_config(force: bool, ctx: &Context) -> Result<()> {
    let path = ctx.config_target();

    if path.exists() && !force {
        bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    StorefrontConfig::default().save(&path)?;
    ctx.output.success(&format!("Created: {}", path.display()));
    Ok(())
}

fn validate_config(ctx: &Context) -> Result<()> {
    ctx.output.header("Validating configuration");

    ctx.config.validate()?;

    if ctx.config.backend.publishable_key.is_none() {
        ctx.output
            .warn("Warning: backend.publishable_key is not set; Medusa v2 stores reject requests without it");
    }
    if ctx.config.backend.url.starts_with("http://") && !ctx.config.backend.url.contains("localhost") {
        ctx.output.warn("Warning: backend.url is not using https");
    }

    ctx.output.success("Configuration is valid");
    Ok(())
}

fn get_config_value(config: &StorefrontConfig, key: &str) -> Result<String> {
    let parts: Vec<&str> = key.split('.').collect();

    let value = match parts.as_slice() {
        ["backend", "url"] => config.backend.url.clone(),
        ["backend", "publishable_key"] => config
            .backend
            .publishable_key
            .clone()
            .unwrap_or_else(|| "null".to_string()),
        ["backend", "timeout_secs"] => config.backend.timeout_secs.to_string(),
        ["backend", "max_retries"] => config.backend.max_retries.to_string(),
        ["store", "region_id"] => config.store.region_id.clone(),
        ["store", "locale"] => config.store.locale.code().to_string(),
        ["cookies", "cart_cookie"] => config.cookies.cart_cookie.clone(),
        ["cookies", "cart_max_age_days"] => config.cookies.cart_max_age_days.to_string(),
        ["cookies", "auth_cookie"] => config.cookies.auth_cookie.clone(),
        _ => bail!("Unknown config key: {}", key),
    };
    Ok(value)
}

fn set_config_value(config: &mut StorefrontConfig, key: &str, value: &str) -> Result<()> {
    let parts: Vec<&str> = key.split('.').collect();

    match parts.as_slice() {
        ["backend", "url"] => config.backend.url = value.to_string(),
        ["backend", "publishable_key"] => {
            config.backend.publishable_key = Some(value.to_string()).filter(|v| !v.is_empty())
        }
        ["backend", "timeout_secs"] => config.backend.timeout_secs = value.parse()?,
        ["backend", "max_retries"] => config.backend.max_retries = value.parse()?,
        ["store", "region_id"] => config.store.region_id = value.to_string(),
        ["store", "locale"] => config.store.locale = value.parse().map_err(anyhow::Error::msg)?,
        ["cookies", "cart_cookie"] => config.cookies.cart_cookie = value.to_string(),
        ["cookies", "cart_max_age_days"] => config.cookies.cart_max_age_days = value.parse()?,
        ["cookies", "auth_cookie"] => config.cookies.auth_cookie = value.to_string(),
        _ => bail!("Unknown or read-only config key: {}", key),
    }

    Ok(())
}
