//! Interactive authorization bootstrap.
//!
//! One-time flow establishing the initial token pair: bind a local
//! listener on the fixed callback port, send the user's browser to the
//! authorization endpoint, and wait for the redirect carrying the
//! authorization code. The listener's handler exchanges the code and
//! persists the pair through the secure store; the calling task polls
//! the same store until the access token appears, then shuts the
//! listener down. The durable store is the synchronization point
//! between the two tasks; there is no in-memory shared token state.
//!
//! If the user never completes authorization this call blocks
//! indefinitely. That is acceptable for an interactive one-shot; a
//! fresh process invocation is the retry mechanism.

use std::process::Command;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use url::Url;

use crate::authority::TokenAuthority;
use crate::config::Credentials;
use crate::store::{CredentialKind, Secret, SecretStore};
use crate::token::{TokenError, TokenRecord};

/// OAuth scope required for activity listing.
const ACTIVITY_SCOPE: &str = "activity:read_all";

/// How often the main task polls the store for the persisted token.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Bound on listener shutdown after the token has been observed.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

const SUCCESS_PAGE: &str = "<html><body>All OK, you can close this tab and go back \
     to the console.<script>window.close('','_parent','');</script></body></html>";

impl<S: SecretStore + 'static> TokenAuthority<S> {
    /// Run the full interactive authorization flow and return the
    /// fresh access token.
    ///
    /// Blocks until the user completes authorization in the browser.
    /// Only one instance can run at a time on a machine; a second one
    /// fails to bind the fixed callback port.
    pub async fn bootstrap(&self, credentials: &Credentials) -> Result<Secret, TokenError> {
        let access_key = CredentialKind::AccessToken.key_for(&credentials.client_id);

        // Drop any stale record so the poll below can only observe the
        // token the listener persists.
        self.store().delete(&access_key).await?;

        let addr = format!("127.0.0.1:{}", self.endpoints().redirect_port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| TokenError::ListenerFailed {
                message: format!("failed to bind {}: {}", addr, e),
            })?;
        tracing::info!("Authorization listener bound on {}", addr);

        let authorize_url = self.authorize_url(credentials)?;
        println!("Open this URL to authorize the application:\n\n  {}\n", authorize_url);
        open_browser(&authorize_url);

        let mut accept_task = tokio::spawn(serve_callbacks(
            listener,
            self.clone(),
            credentials.clone(),
        ));

        let record = loop {
            if let Some(raw) = self.store().get(&access_key).await? {
                break TokenRecord::from_json(raw.expose())?;
            }

            tokio::select! {
                res = &mut accept_task => {
                    // The accept loop only ends on a fatal error; a
                    // successful exchange keeps it serving until we
                    // shut it down below.
                    return Err(match res {
                        Ok(Err(e)) => e,
                        Ok(Ok(())) => TokenError::ListenerFailed {
                            message: "listener exited before a token was persisted".to_string(),
                        },
                        Err(join) => TokenError::ListenerFailed {
                            message: format!("listener task failed: {}", join),
                        },
                    });
                }
                _ = tokio::time::sleep(POLL_INTERVAL) => {}
            }
        };

        accept_task.abort();
        let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, accept_task).await;
        tracing::info!("Authorization complete, listener shut down");

        Ok(record.token)
    }

    /// Authorization endpoint URL the user must visit.
    fn authorize_url(&self, credentials: &Credentials) -> Result<String, TokenError> {
        let mut url = Url::parse(&self.endpoints().auth_url).map_err(|e| {
            TokenError::InvalidEndpoint {
                message: format!("auth URL: {}", e),
            }
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &self.endpoints().redirect_uri())
            .append_pair("approval_prompt", "force")
            .append_pair("scope", ACTIVITY_SCOPE);
        Ok(url.into())
    }
}

/// Accept loop for the local callback endpoint.
///
/// Serves until aborted. A request to `/exchange_token?code=..`
/// triggers the code exchange and persists the token pair; a failed
/// exchange is fatal and ends the loop with the error. Anything else
/// (favicon probes and the like) gets a 404 and the loop continues.
async fn serve_callbacks<S: SecretStore + 'static>(
    listener: TcpListener,
    authority: TokenAuthority<S>,
    credentials: Credentials,
) -> Result<(), TokenError> {
    loop {
        let (mut socket, _) = listener
            .accept()
            .await
            .map_err(|e| TokenError::ListenerFailed {
                message: format!("accept failed: {}", e),
            })?;

        let path = match read_request_path(&mut socket).await {
            Ok(path) => path,
            Err(e) => {
                tracing::warn!("Ignoring unreadable callback request: {}", e);
                continue;
            }
        };

        match parse_code(&path) {
            Some(code) => match authority.exchange_code(&credentials, &code).await {
                Ok(_) => respond(&mut socket, "200 OK", SUCCESS_PAGE).await,
                Err(e) => {
                    respond(
                        &mut socket,
                        "502 Bad Gateway",
                        "<html><body>Authorization failed, check the console.</body></html>",
                    )
                    .await;
                    return Err(e);
                }
            },
            None => {
                respond(&mut socket, "404 Not Found", "<html><body>Not found</body></html>")
                    .await;
            }
        }
    }
}

async fn read_request_path(socket: &mut TcpStream) -> Result<String, std::io::Error> {
    let mut buffer = [0u8; 4096];
    let n = socket.read(&mut buffer).await?;
    let request = String::from_utf8_lossy(&buffer[..n]).into_owned();

    let path = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("/")
        .to_string();
    Ok(path)
}

/// Extract the `code` query parameter from a callback path.
fn parse_code(path: &str) -> Option<String> {
    if !path.starts_with("/exchange_token") {
        return None;
    }
    let query = path.split('?').nth(1)?;
    query.split('&').find_map(|param| {
        let mut parts = param.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("code"), Some(value)) if !value.is_empty() => Some(value.to_string()),
            _ => None,
        }
    })
}

async fn respond(socket: &mut TcpStream, status: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/html\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    if let Err(e) = socket.write_all(response.as_bytes()).await {
        tracing::warn!("Failed to write callback response: {}", e);
    }
}

/// Launch the default browser at the given URL.
///
/// On macOS use `open`, on Linux `xdg-open`, on Windows `start`. The
/// URL is always printed beforehand, so a failure here only costs the
/// user a copy-paste.
fn open_browser(url: &str) {
    let result = if cfg!(target_os = "macos") {
        Command::new("open").arg(url).spawn()
    } else if cfg!(windows) {
        Command::new("cmd").args(["/C", "start", url]).spawn()
    } else {
        Command::new("xdg-open").arg(url).spawn()
    };

    if let Err(e) = result {
        tracing::warn!("Failed to open browser: {}", e);
    }
}
