//! OAuth session lifecycle: the authorization round trip, token storage and
//! expiry-driven refresh.
//!
//! Refresh is fail-closed. Any failure to obtain a fresh token clears the
//! whole stored session, so callers either get a token that was valid moments
//! ago or an error that tells the user to reconnect.
use chrono::Utc;
use reqwest::Url;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::time::{timeout, Duration};
use tracing::{info, instrument, warn};

use crate::error::SyncError;
use crate::model::{AuthMethod, AuthSession};
use crate::notion::model::TokenGrant;
use crate::notion::TokenService;
use crate::store::SettingsStore;

const AUTHORIZE_URL: &str = "https://api.notion.com/v1/oauth/authorize";
const CALLBACK_PATH: &str = "/oauth2";
const CALLBACK_READ_LIMIT: Duration = Duration::from_secs(10);

/// The URL the user opens in a browser to grant access.
pub fn authorize_url(client_id: &str, redirect_uri: &str) -> String {
    // owner=user scopes the grant to workspaces the authorizing user picks
    Url::parse_with_params(
        AUTHORIZE_URL,
        &[
            ("client_id", client_id),
            ("response_type", "code"),
            ("owner", "user"),
            ("redirect_uri", redirect_uri),
        ],
    )
    .expect("valid authorize URL")
    .to_string()
}

pub fn redirect_uri(port: u16) -> String {
    format!("http://127.0.0.1:{port}{CALLBACK_PATH}")
}

/// Classify a redirect URL: explicit denial, any other provider error, a
/// grant code, or a malformed callback. An error parameter wins even when a
/// code is also present.
pub fn parse_callback(url: &Url) -> Result<String, SyncError> {
    let mut code = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "error" if value == "access_denied" => return Err(SyncError::AuthorizationDenied),
            "error" => return Err(SyncError::AuthorizationError(value.into_owned())),
            "code" => code = Some(value.into_owned()),
            _ => {}
        }
    }
    code.ok_or(SyncError::CallbackParseError)
}

fn request_path(head: &str) -> Option<&str> {
    head.lines().next()?.split_whitespace().nth(1)
}

async fn respond(stream: &mut tokio::net::TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {status}\r\nContent-Type: text/html; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    // The outcome is already decided; a failed reply only affects the browser tab.
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

/// Listen on the loopback redirect port until one authorization outcome
/// arrives. Stray requests (favicons, probes) get a 404 and the wait
/// continues.
#[instrument(skip_all, fields(port))]
pub async fn capture_callback(port: u16) -> Result<String, SyncError> {
    let listener = TcpListener::bind(("127.0.0.1", port))
        .await
        .map_err(|e| SyncError::AuthorizationError(format!("cannot listen on port {port}: {e}")))?;
    info!(port, "waiting for the authorization redirect");

    loop {
        let (mut stream, peer) = listener
            .accept()
            .await
            .map_err(|e| SyncError::AuthorizationError(format!("accept failed: {e}")))?;

        let mut buf = vec![0u8; 8192];
        let n = match timeout(CALLBACK_READ_LIMIT, stream.read(&mut buf)).await {
            Ok(Ok(n)) if n > 0 => n,
            Ok(Ok(_)) => continue,
            Ok(Err(e)) => {
                warn!(%peer, error = %e, "failed to read redirect request");
                continue;
            }
            Err(_) => {
                warn!(%peer, "redirect request timed out");
                continue;
            }
        };
        let head = String::from_utf8_lossy(&buf[..n]);
        let Some(path) = request_path(&head) else {
            respond(&mut stream, "400 Bad Request", "<html><body>Bad request</body></html>").await;
            continue;
        };
        if !path.starts_with(CALLBACK_PATH) {
            respond(&mut stream, "404 Not Found", "<html><body>Not found</body></html>").await;
            continue;
        }
        let url = match Url::parse(&format!("http://127.0.0.1{path}")) {
            Ok(url) => url,
            Err(_) => {
                respond(&mut stream, "400 Bad Request", "<html><body>Bad request</body></html>").await;
                return Err(SyncError::CallbackParseError);
            }
        };

        let result = parse_callback(&url);
        let body = match &result {
            Ok(_) => "<html><body><h3>Authorization complete.</h3>You can close this tab and return to the terminal.</body></html>",
            Err(_) => "<html><body><h3>Authorization was not completed.</h3>You can close this tab.</body></html>",
        };
        respond(&mut stream, "200 OK", body).await;
        return result;
    }
}

fn session_from_grant(grant: TokenGrant, method: AuthMethod) -> AuthSession {
    AuthSession {
        access_token: grant.access_token,
        refresh_token: grant.refresh_token,
        expires_at: grant.expires_at,
        workspace_id: grant.workspace_id,
        workspace_name: grant.workspace_name,
        workspace_icon: grant.workspace_icon,
        auth_method: method,
    }
}

/// Exchange a grant code and persist the resulting session.
#[instrument(skip_all)]
pub async fn connect(
    store: &SettingsStore,
    tokens: &dyn TokenService,
    code: &str,
    redirect_uri: &str,
) -> Result<AuthSession, SyncError> {
    let grant = tokens.exchange_code(code, redirect_uri).await?;
    let session = session_from_grant(grant, AuthMethod::Oauth);
    store.save_auth_session(&session).await?;
    info!(
        workspace = session.workspace_name.as_deref().unwrap_or("unknown"),
        "workspace connected"
    );
    Ok(session)
}

/// Store a manually issued integration token as a non-expiring session.
pub async fn connect_manual(store: &SettingsStore, token: &str) -> Result<AuthSession, SyncError> {
    let session = AuthSession {
        access_token: token.to_string(),
        refresh_token: None,
        expires_at: None,
        workspace_id: None,
        workspace_name: None,
        workspace_icon: None,
        auth_method: AuthMethod::Manual,
    };
    store.save_auth_session(&session).await?;
    info!("manual token stored");
    Ok(session)
}

/// A currently valid access token, refreshing the stored session first when
/// it has expired.
#[instrument(skip_all)]
pub async fn access_token(
    store: &SettingsStore,
    tokens: &dyn TokenService,
) -> Result<String, SyncError> {
    let Some(session) = store.auth_session().await? else {
        return Err(SyncError::NotAuthorized);
    };
    if !session.is_expired(Utc::now()) {
        return Ok(session.access_token);
    }
    let refreshed = refresh(store, tokens, &session).await?;
    Ok(refreshed.access_token)
}

/// Refresh an expired session. On any failure the stored session is cleared
/// before the error surfaces.
#[instrument(skip_all)]
pub async fn refresh(
    store: &SettingsStore,
    tokens: &dyn TokenService,
    session: &AuthSession,
) -> Result<AuthSession, SyncError> {
    let Some(refresh_token) = session.refresh_token.as_deref() else {
        store.clear_auth_session().await?;
        warn!("session expired without a refresh token; cleared stored session");
        return Err(SyncError::RefreshFailed("no refresh token stored".into()));
    };
    match tokens.refresh(refresh_token).await {
        Ok(grant) => {
            let updated = AuthSession {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token.or_else(|| session.refresh_token.clone()),
                expires_at: grant.expires_at,
                workspace_id: grant.workspace_id.or_else(|| session.workspace_id.clone()),
                workspace_name: grant.workspace_name.or_else(|| session.workspace_name.clone()),
                workspace_icon: grant.workspace_icon.or_else(|| session.workspace_icon.clone()),
                auth_method: AuthMethod::Oauth,
            };
            store.save_auth_session(&updated).await?;
            info!("session refreshed");
            Ok(updated)
        }
        Err(err) => {
            store.clear_auth_session().await?;
            warn!(error = %err, "token refresh failed; cleared stored session");
            Err(SyncError::RefreshFailed(err.to_string()))
        }
    }
}

/// Forget the session and the destination configuration.
pub async fn disconnect(store: &SettingsStore) -> Result<(), SyncError> {
    store.clear_connection().await?;
    info!("workspace disconnected");
    Ok(())
}
