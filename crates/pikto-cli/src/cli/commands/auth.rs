//! Login and logout.

use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use pikto_core::config::{paths, Config};
use pikto_core::session::SessionLifecycle;

pub async fn login(config: &Config, code: Option<String>) -> Result<()> {
    let session = SessionLifecycle::new(config.clone(), paths::pikto_home());

    let input = match code {
        Some(code) => code,
        None => prompt_for_code(config)?,
    };

    let services = session.login(&input).await?;
    let profile = &services.profile;
    if profile.name.is_empty() {
        println!("Logged in as {}", profile.login_name);
    } else {
        println!("Logged in as {} ({})", profile.name, profile.login_name);
    }
    Ok(())
}

pub fn logout(config: &Config) -> Result<()> {
    let session = SessionLifecycle::new(config.clone(), paths::pikto_home());
    session.logout()?;
    println!("Logged out.");
    Ok(())
}

fn prompt_for_code(config: &Config) -> Result<String> {
    let authorize_url = config.build_authorize_url()?;
    println!("Open this URL in a browser and authorize the application:");
    println!("\n  {authorize_url}\n");
    print!("Paste the authorization code (or redirect URL): ");
    std::io::stdout().flush().context("flush stdout")?;

    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read authorization code from stdin")?;
    Ok(line)
}
