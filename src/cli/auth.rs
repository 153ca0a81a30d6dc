//! CLI auth command handlers for login, status, and logout.

use std::io::Write;

use crate::http::{AuthClient, SessionStatus};

/// Handle `hackportal auth login <email>`.
pub async fn handle_login(
    client: &AuthClient,
    email: &str,
    password: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let password = match password {
        Some(p) => p,
        None => prompt_password()?,
    };
    if password.is_empty() {
        return Err("no password provided".into());
    }
    client.sign_in(email, &password).await?;
    println!("✅ Signed in as {email}");
    Ok(())
}

/// Handle `hackportal auth status`.
pub async fn handle_status(client: &AuthClient) -> Result<(), Box<dyn std::error::Error>> {
    let config = client.config();
    println!("🔐 Session Status\n");
    println!("  API: {}", config.base_url);
    println!("  Profile: {}", config.profile);
    match client.session_status()? {
        SessionStatus::SignedIn => println!("  Session: ✅ Signed in"),
        SessionStatus::SignedOut => println!("  Session: ❌ Not signed in"),
    }
    Ok(())
}

/// Handle `hackportal auth logout`.
pub async fn handle_logout(client: &AuthClient) -> Result<(), Box<dyn std::error::Error>> {
    client.sign_out().await?;
    println!("✅ Signed out");
    Ok(())
}

fn prompt_password() -> std::io::Result<String> {
    print!("Password: ");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
