//! `authorization` commands: server-side OAuth configurations and the
//! interactive authorization-code exchange

use super::{list_paginated, parse_key_value, Context};
use crate::error::{Error, Result};
use crate::gcp::params::QueryParams;
use crate::output;
use clap::Subcommand;
use dialoguer::{Input, Password};
use reqwest::Method;
use serde_json::{json, Value};
use std::path::Path;

/// Scopes requested when none are given
pub const DEFAULT_SCOPES: &[&str] = &["https://www.googleapis.com/auth/cloud-platform", "openid"];

/// Script written by `get-token`
pub const TOKEN_SCRIPT: &str = "set_auth_token_env_var.sh";

#[derive(Subcommand, Debug)]
pub enum AuthorizationCommand {
    /// List authorizations
    List,

    /// Create an authorization; prompts for the OAuth client secret
    Create {
        auth_id: String,
        /// OAuth client ID
        client_id: String,
        #[arg(long, default_value = "https://accounts.google.com/o/oauth2/v2/auth")]
        base_auth_uri: String,
        #[arg(long, default_value = "https://oauth2.googleapis.com/token")]
        token_uri: String,
        /// Scope to request (repeatable)
        #[arg(long = "scope", default_values = DEFAULT_SCOPES)]
        scopes: Vec<String>,
    },

    /// Delete an authorization
    Delete { auth_id: String },

    /// Run the OAuth flow by hand and write a script exporting the token
    GetToken {
        auth_id: String,
        /// Must be listed in the OAuth client's authorized redirect URIs
        #[arg(long, default_value = "https://localhost:8080/")]
        redirect_uri: String,
        /// Extra authorization URL parameter, e.g. `login_hint=me@example.com` (repeatable)
        #[arg(long = "extra-url-param", value_parser = parse_key_value)]
        extra_url_params: Vec<(String, String)>,
        /// Variable the script exports
        #[arg(long, default_value = "GE_AUTH_TOKEN")]
        destination_env_var: String,
    },
}

/// Full authorization URI for a new server-side OAuth configuration
pub fn generate_auth_uri(client_id: &str, scopes: &[String], base_auth_uri: &str) -> Result<String> {
    let mut url = url::Url::parse(base_auth_uri)
        .map_err(|e| Error::validation(format!("invalid authorization URI {}: {}", base_auth_uri, e)))?;

    url.query_pairs_mut()
        .append_pair("client_id", client_id)
        .append_pair("scope", &scopes.join(" "))
        .append_pair("include_granted_scopes", "true")
        .append_pair("response_type", "code")
        .append_pair("access_type", "offline")
        .append_pair("prompt", "consent");

    Ok(url.to_string())
}

/// Stored authorization URI plus the redirect and any extra parameters
pub fn consent_url(authorization_uri: &str, redirect_uri: &str, extra: &[(String, String)]) -> String {
    let mut params = vec![("redirect_uri".to_string(), redirect_uri.to_string())];
    params.extend(extra.iter().cloned());

    let encoded = params
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if authorization_uri.contains('?') { '&' } else { '?' };
    format!("{}{}{}", authorization_uri, separator, encoded)
}

/// Pull `code` out of the URL the browser was redirected to
pub fn extract_code(redirected_url: &str) -> Result<String> {
    let url = url::Url::parse(redirected_url.trim())
        .map_err(|e| Error::validation(format!("invalid redirected url: {}", e)))?;

    url.query_pairs()
        .find(|(k, _)| k == "code")
        .map(|(_, v)| v.into_owned())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| Error::validation("code not found in redirected url"))
}

pub fn token_script(env_var: &str, token: &str) -> String {
    format!("export {}={}\n", env_var, token)
}

fn oauth_field<'a>(auth: &'a Value, field: &str) -> Result<&'a str> {
    auth.get("serverSideOauth2")
        .and_then(|o| o.get(field))
        .and_then(|v| v.as_str())
        .ok_or_else(|| Error::validation(format!("authorization has no serverSideOauth2.{}", field)))
}

fn write_token_script(path: &Path, content: &str) -> Result<()> {
    std::fs::write(path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(())
}

pub async fn run(ctx: &Context, command: AuthorizationCommand) -> Result<()> {
    let client = ctx.discovery_engine()?;

    match command {
        AuthorizationCommand::List => {
            list_paginated(ctx, &client, "authorizations", output::render_authorizations).await
        }
        AuthorizationCommand::Create {
            auth_id,
            client_id,
            base_auth_uri,
            token_uri,
            scopes,
        } => {
            let client_secret = Password::new()
                .with_prompt("client secret")
                .with_confirmation("confirm", "Secrets do not match. Please try again.")
                .interact()?;
            let auth_uri = generate_auth_uri(&client_id, &scopes, &base_auth_uri)?;

            let payload = json!({
                "name": format!("projects/{}/locations/{}/authorizations/{}", ctx.project_id, ctx.location, auth_id),
                "serverSideOauth2": {
                    "clientId": client_id,
                    "clientSecret": client_secret,
                    "authorizationUri": auth_uri,
                    "tokenUri": token_uri,
                }
            });
            let params = QueryParams::new().with("authorizationId", auth_id.as_str());

            let response = client
                .request(Method::POST, "authorizations", Some(&params), Some(&payload))
                .await?;
            let name = response.get("name").and_then(|v| v.as_str()).unwrap_or("-");
            ctx.report(&response, &format!("Authorization created. Name: {}", name))
        }
        AuthorizationCommand::Delete { auth_id } => {
            let response = client
                .delete(&format!("authorizations/{}", auth_id), None)
                .await?;
            ctx.report(&response, "Authorization deleted")
        }
        AuthorizationCommand::GetToken {
            auth_id,
            redirect_uri,
            extra_url_params,
            destination_env_var,
        } => {
            eprintln!(
                "WARNINGS:\n\
                 1. This only works if the redirect_uri is in the list of 'Authorized redirect URIs' of the OAuth client.\n\
                 2. The redirect usually points at localhost and will fail in the browser on purpose. Copy the resulting URL from the address bar.\n\
                 3. You will be asked for the OAuth client secret, have it at hand.\n"
            );

            let auth = client.get(&format!("authorizations/{}", auth_id), None).await?;
            let authorization_uri = oauth_field(&auth, "authorizationUri")?;
            let token_uri = oauth_field(&auth, "tokenUri")?;
            let oauth_client_id = oauth_field(&auth, "clientId")?;

            println!(
                "Please open the following URL in your browser to authorize the application:\n{}\n",
                consent_url(authorization_uri, &redirect_uri, &extra_url_params)
            );

            let redirected: String = Input::new()
                .with_prompt("Paste the full redirected URL here")
                .interact_text()?;
            let code = extract_code(&redirected)?;

            let client_secret = Password::new()
                .with_prompt("Enter your OAuth client secret")
                .interact()?;

            let token_info = client
                .http()
                .post_form(
                    token_uri,
                    &[
                        ("code", code.as_str()),
                        ("client_id", oauth_client_id),
                        ("client_secret", client_secret.as_str()),
                        ("redirect_uri", redirect_uri.as_str()),
                        ("grant_type", "authorization_code"),
                    ],
                )
                .await?;

            let Some(access_token) = token_info.get("access_token").and_then(|v| v.as_str()) else {
                return Err(Error::validation(format!(
                    "access_token not found in response\n{}",
                    token_info
                )));
            };

            write_token_script(Path::new(TOKEN_SCRIPT), &token_script(&destination_env_var, access_token))?;
            println!(
                "script written, to activate use:\n\
                 source ./{}\n\n\
                 after that, you can use the variable like this:\n\
                 [your command here] ${}",
                TOKEN_SCRIPT, destination_env_var
            );
            Ok(())
        }
    }
}
