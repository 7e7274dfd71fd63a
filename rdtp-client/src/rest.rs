//! REST/HTTP chat backend.
//!
//! Thin wrapper over the chat service's HTTP API, sharing the error taxonomy
//! and session lifecycle with the RDTP client. There is no push channel over
//! HTTP; `fetch` is the only message retrieval path.

use crate::error::ClientError;
use crate::session::SessionState;
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::time::Duration;

/// Basic-auth username that marks the password field as a session token.
const TOKEN_AUTH_USER: &str = "TOK";

/// Chat client over the REST backend.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    session: Mutex<SessionState>,
}

impl RestClient {
    /// Creates a new client for `http://host:port`.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            session: Mutex::new(SessionState::new()),
        })
    }

    /// Returns the logged-in username, if any.
    pub fn username(&self) -> Option<String> {
        self.session.lock().username().map(str::to_owned)
    }

    /// Returns whether a session is established.
    pub fn authenticated(&self) -> bool {
        self.session.lock().authenticated()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn token(&self) -> Result<String, ClientError> {
        self.session
            .lock()
            .token()
            .map(str::to_owned)
            .ok_or(ClientError::NotAuthenticated)
    }

    /// Parses a response body, surfacing the server's error envelope.
    async fn into_checked_json(response: reqwest::Response) -> Result<Value, ClientError> {
        let body: Value = response.json().await?;

        if let Some(errors) = body.get("errors") {
            let code = errors
                .get("status_code")
                .and_then(Value::as_u64)
                .unwrap_or(0);
            return Err(match code {
                401 => ClientError::Auth("invalid or expired session".to_owned()),
                _ => ClientError::Application(format!(
                    "server rejected the request (status {code})"
                )),
            });
        }

        Ok(body)
    }

    fn string_list(body: &Value, path: &[&str]) -> Result<Vec<String>, ClientError> {
        let mut node = body;
        for key in path {
            node = node
                .get(key)
                .ok_or_else(|| ClientError::BadResponse(format!("missing field `{key}`")))?;
        }
        let items = node
            .as_array()
            .ok_or_else(|| ClientError::BadResponse("expected a list".to_owned()))?;
        Ok(items
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_owned)
            .collect())
    }

    // =========================================================================
    // Accounts and sessions
    // =========================================================================

    /// Creates an account with the given username and password.
    pub async fn create_account(&self, username: &str, password: &str) -> Result<(), ClientError> {
        let response = self
            .http
            .post(self.url("/users"))
            .json(&json!({"username": username, "password": password}))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        Ok(())
    }

    /// Checks whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .get(self.url("/users"))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .query(&[("wildcard", username)])
            .send()
            .await?;
        let body = Self::into_checked_json(response).await?;
        let users = Self::string_list(&body, &["data", "users"])?;
        Ok(users.iter().any(|u| u == username))
    }

    /// Logs in, establishing a session. An existing session is terminated
    /// first with an awaited logout; a failed logout aborts the new attempt.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        if self.session.lock().authenticated() {
            self.logout().await?;
        }

        let response = self
            .http
            .post(self.url("/login"))
            .basic_auth(username, Some(password))
            .send()
            .await?;
        let body = Self::into_checked_json(response).await?;

        let token = body
            .pointer("/data/user/session_token")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ClientError::BadResponse("login reply carried no session token".to_owned())
            })?;

        self.session.lock().begin(username, token);
        Ok(())
    }

    /// Logs out, clearing the session. Fails fast locally when not logged in.
    pub async fn logout(&self) -> Result<(), ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.url("/logout"))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        self.session.lock().clear();
        Ok(())
    }

    /// Deletes the logged-in account and clears the session.
    pub async fn delete_account(&self) -> Result<(), ClientError> {
        let token = self.token()?;
        let username = self
            .session
            .lock()
            .username()
            .map(str::to_owned)
            .ok_or(ClientError::NotAuthenticated)?;

        let response = self
            .http
            .delete(self.url(&format!("/users/{username}")))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        self.session.lock().clear();
        Ok(())
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Creates a group.
    pub async fn create_group(&self, group: &str) -> Result<(), ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.url("/groups"))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .json(&json!({"data": {"group_name": group}}))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        Ok(())
    }

    /// Adds a user to a group.
    pub async fn add_user_to_group(&self, username: &str, group: &str) -> Result<(), ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.url(&format!("/groups/{group}/users")))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .json(&json!({"data": {"username": username}}))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        Ok(())
    }

    /// Adds the logged-in user to a group.
    pub async fn join_group(&self, group: &str) -> Result<(), ClientError> {
        let username = self.username().ok_or(ClientError::NotAuthenticated)?;
        self.add_user_to_group(&username, group).await
    }

    /// Lists users in a group.
    pub async fn users_in_group(&self, group: &str) -> Result<Vec<String>, ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .get(self.url(&format!("/groups/{group}/users")))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .send()
            .await?;
        let body = Self::into_checked_json(response).await?;
        Self::string_list(&body, &["data", "users"])
    }

    /// Lists groups matching a wildcard query.
    pub async fn groups(&self, wildcard: &str) -> Result<Vec<String>, ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .get(self.url("/groups"))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .query(&[("wildcard", wildcard)])
            .send()
            .await?;
        let body = Self::into_checked_json(response).await?;
        Self::string_list(&body, &["data", "groups"])
    }

    // =========================================================================
    // Presence and messaging
    // =========================================================================

    /// Lists known users.
    pub async fn users_online(&self) -> Result<Vec<String>, ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .get(self.url("/users"))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .query(&[("wildcard", "*")])
            .send()
            .await?;
        let body = Self::into_checked_json(response).await?;
        Self::string_list(&body, &["data", "users"])
    }

    /// Sends a direct message to a user.
    pub async fn send_user(&self, username: &str, message: &str) -> Result<(), ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.url(&format!("/users/{username}/messages")))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .json(&json!({"data": {"message": message}}))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        Ok(())
    }

    /// Sends a message to a group.
    pub async fn send_group(&self, group: &str, message: &str) -> Result<(), ClientError> {
        let token = self.token()?;
        let response = self
            .http
            .post(self.url(&format!("/groups/{group}/messages")))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .json(&json!({"data": {"message": message}}))
            .send()
            .await?;
        Self::into_checked_json(response).await?;
        Ok(())
    }

    /// Fetches messages queued for the logged-in user, formatted one line per
    /// message.
    pub async fn fetch(&self) -> Result<Vec<String>, ClientError> {
        let token = self.token()?;
        let username = self
            .session
            .lock()
            .username()
            .map(str::to_owned)
            .ok_or(ClientError::NotAuthenticated)?;

        let response = self
            .http
            .get(self.url(&format!("/users/{username}/messages")))
            .basic_auth(TOKEN_AUTH_USER, Some(&token))
            .send()
            .await?;
        let body = Self::into_checked_json(response).await?;

        let messages = body
            .pointer("/data/messages")
            .and_then(Value::as_array)
            .ok_or_else(|| ClientError::BadResponse("missing message list".to_owned()))?;

        Ok(messages.iter().map(format_message).collect())
    }
}

/// Renders one fetched message the way the terminal shows live pushes.
fn format_message(msg: &Value) -> String {
    let from = msg
        .get("from_username")
        .and_then(Value::as_str)
        .unwrap_or("?");
    let body = msg.get("message").and_then(Value::as_str).unwrap_or("");

    match msg.get("from_group_name").and_then(Value::as_str) {
        Some(group) => format!("{from} @ {group} >>> {body}"),
        None => format!("{from} >>> {body}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = RestClient::new("http://127.0.0.1:5000/").unwrap();
        assert_eq!(client.url("/users"), "http://127.0.0.1:5000/users");
    }

    #[test]
    fn test_format_message() {
        let direct = json!({"from_username": "alice", "from_group_name": null, "message": "hi"});
        assert_eq!(format_message(&direct), "alice >>> hi");

        let grouped =
            json!({"from_username": "bob", "from_group_name": "ops", "message": "deploy done"});
        assert_eq!(format_message(&grouped), "bob @ ops >>> deploy done");
    }

    #[test]
    fn test_string_list_errors() {
        let body = json!({"data": {"users": ["a", "b"]}});
        let users = RestClient::string_list(&body, &["data", "users"]).unwrap();
        assert_eq!(users, vec!["a", "b"]);

        let err = RestClient::string_list(&body, &["data", "groups"]).unwrap_err();
        assert!(matches!(err, ClientError::BadResponse(_)));
    }

    #[tokio::test]
    async fn test_authed_calls_fail_fast_when_logged_out() {
        let client = RestClient::new("http://127.0.0.1:5000").unwrap();
        assert!(matches!(
            client.logout().await,
            Err(ClientError::NotAuthenticated)
        ));
        assert!(matches!(
            client.send_user("bob", "hi").await,
            Err(ClientError::NotAuthenticated)
        ));
        assert!(matches!(
            client.fetch().await,
            Err(ClientError::NotAuthenticated)
        ));
    }
}
