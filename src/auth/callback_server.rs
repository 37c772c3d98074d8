//! Local HTTP callback server for OAuth authentication.
//!
//! Provides a temporary localhost server to receive the OAuth redirect,
//! show a short result page in the browser, and pass the callback URL back
//! to the sign-in flow.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

use crate::error::AuthError;

/// Result from the callback server.
#[derive(Debug)]
pub enum CallbackResult {
    /// Successfully received callback with the full URL.
    Success(String),
    /// No callback arrived before the deadline.
    TimedOut,
    /// Error occurred.
    Error(String),
}

/// One-shot loopback listener for the OAuth redirect.
pub struct CallbackServer {
    listener: TcpListener,
    port: u16,
}

impl CallbackServer {
    /// Bind the callback port on the loopback interface.
    ///
    /// Binding happens before the browser is opened so a busy port fails fast.
    pub fn bind(port: u16) -> Result<Self, AuthError> {
        let addr = format!("127.0.0.1:{}", port);

        let listener = TcpListener::bind(&addr).map_err(|e| {
            error!("Failed to bind callback server to {}: {}", addr, e);
            AuthError::CallbackServer(format!("Failed to start server on {}: {}", addr, e))
        })?;

        // Set non-blocking so the deadline can be checked between accepts
        listener
            .set_nonblocking(true)
            .map_err(|e| AuthError::CallbackServer(format!("Server configuration error: {}", e)))?;

        let port = listener
            .local_addr()
            .map_err(|e| AuthError::CallbackServer(e.to_string()))?
            .port();

        info!("OAuth callback server listening on 127.0.0.1:{}", port);
        Ok(Self { listener, port })
    }

    /// The port actually bound.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Wait for a single OAuth callback on `callback_path`.
    ///
    /// Returns the full callback URL (including query parameters) when received.
    /// The server shuts down when this returns.
    pub fn wait(self, callback_path: &str, timeout: Duration) -> CallbackResult {
        let deadline = Instant::now() + timeout;

        loop {
            if Instant::now() >= deadline {
                info!("Callback server timed out");
                return CallbackResult::TimedOut;
            }

            match self.listener.accept() {
                Ok((stream, peer_addr)) => {
                    debug!("Connection from {}", peer_addr);
                    if let Some(url) = self.handle_connection(stream, callback_path) {
                        info!("OAuth callback received");
                        return CallbackResult::Success(url);
                    }
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    // No connection yet, sleep briefly and retry
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    error!("Error accepting connection: {}", e);
                    return CallbackResult::Error(format!("Connection error: {}", e));
                }
            }
        }
    }

    /// Handle an incoming HTTP connection.
    ///
    /// Returns Some(url) if this was a valid OAuth callback, None otherwise.
    fn handle_connection(&self, mut stream: TcpStream, callback_path: &str) -> Option<String> {
        let _ = stream.set_nonblocking(false);
        let _ = stream.set_read_timeout(Some(Duration::from_secs(5)));

        let mut buffer = [0; 4096];
        let bytes_read = match stream.read(&mut buffer) {
            Ok(n) => n,
            Err(e) => {
                debug!("Failed to read request: {}", e);
                return None;
            }
        };

        let request = String::from_utf8_lossy(&buffer[..bytes_read]);
        let request_line = request.lines().next()?;
        debug!("Received request: {}", request_line);

        let parts: Vec<&str> = request_line.split_whitespace().collect();
        if parts.len() < 2 {
            send_response(&mut stream, 400, "Bad Request", "text/plain", "Bad Request");
            return None;
        }

        let method = parts[0];
        let path = parts[1];

        if method != "GET" {
            send_response(&mut stream, 405, "Method Not Allowed", "text/plain", "Method Not Allowed");
            return None;
        }

        if !path.starts_with(callback_path) {
            send_response(&mut stream, 404, "Not Found", "text/plain", "Not Found");
            return None;
        }

        let url = format!("http://localhost:{}{}", self.port, path);

        // Error callbacks are still handed back so the flow can report them
        if path.contains("error=") {
            send_response(&mut stream, 200, "OK", "text/html; charset=utf-8", &error_page(path));
            return Some(url);
        }

        if !path.contains("code=") {
            send_response(&mut stream, 400, "Bad Request", "text/plain", "Missing authorization code");
            return None;
        }

        send_response(&mut stream, 200, "OK", "text/html; charset=utf-8", SUCCESS_PAGE);
        Some(url)
    }
}

const SUCCESS_PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Signed in</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 4rem;">
    <h1>Signed in</h1>
    <p>Return to the terminal to choose a role. You can close this tab.</p>
</body>
</html>"#;

fn error_page(path: &str) -> String {
    let description = path
        .split_once("error_description=")
        .map(|(_, rest)| rest.split('&').next().unwrap_or(rest))
        .and_then(|raw| urlencoding::decode(&raw.replace('+', " ")).ok().map(|s| s.into_owned()))
        .unwrap_or_else(|| "Authentication was cancelled or failed.".to_string());

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Sign-in failed</title></head>
<body style="font-family: sans-serif; text-align: center; margin-top: 4rem;">
    <h1>Sign-in failed</h1>
    <p>{}</p>
    <p>You can close this tab and try again.</p>
</body>
</html>"#,
        escape_html(&description)
    )
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn send_response(stream: &mut TcpStream, status: u16, reason: &str, content_type: &str, body: &str) {
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        content_type,
        body.len(),
        body
    );

    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}
