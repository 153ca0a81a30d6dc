//! CLI handlers for raw API requests.

use crate::error::PortalError;
use crate::http::{AuthClient, RequestDescriptor};

/// Handle `hackportal get <path>`.
pub async fn handle_get(
    client: &AuthClient,
    path: &str,
    query: &[(String, String)],
) -> Result<(), Box<dyn std::error::Error>> {
    let descriptor = query
        .iter()
        .fold(RequestDescriptor::get(path), |d, (k, v)| d.with_query(k, v));
    print_response(client, descriptor).await
}

/// Handle `hackportal post <path> --data <json>`.
pub async fn handle_post(
    client: &AuthClient,
    path: &str,
    data: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let body: serde_json::Value = serde_json::from_str(data)
        .map_err(|e| PortalError::InvalidArgument(format!("--data is not JSON: {e}")))?;
    print_response(client, RequestDescriptor::post(path).with_body(body)).await
}

async fn print_response(
    client: &AuthClient,
    descriptor: RequestDescriptor,
) -> Result<(), Box<dyn std::error::Error>> {
    let response = match client.send(descriptor).await {
        Ok(response) => response,
        Err(e) if e.is_session_ended() => {
            return Err(format!("{e}\nRun `hackportal auth login <email>` to sign in again.").into())
        }
        Err(e) => return Err(e.into()),
    };
    let text = response.text().await?;
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{text}"),
    }
    Ok(())
}
