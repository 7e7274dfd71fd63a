//! High-level RDTP chat client: request dispatch and session lifecycle.

use crate::connection::{ConnectConfig, Connection};
use crate::error::ClientError;
use crate::session::SessionState;
use parking_lot::Mutex;
use rdtp_protocol::{Action, Command, Status};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

/// Chat client over the RDTP socket protocol.
///
/// One persistent connection, two execution contexts: the foreground path
/// (these methods) issues commands and blocks on the mailbox; the background
/// listener drains the socket. Requests are strictly sequential - the mailbox
/// rejects a second dispatch while one is in flight.
pub struct RdtpClient {
    conn: Arc<Connection>,
    session: Mutex<SessionState>,
    listener: Mutex<Option<JoinHandle<()>>>,
}

impl RdtpClient {
    /// Creates a new client with the given configuration (not yet connected).
    pub fn new(config: ConnectConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
            session: Mutex::new(SessionState::new()),
            listener: Mutex::new(None),
        }
    }

    /// Connects to the server and starts the background listener.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await?;

        let conn = Arc::clone(&self.conn);
        let handle = tokio::spawn(async move {
            if let Err(e) = conn.read_loop().await {
                tracing::debug!("listener stopped: {}", e);
            }
        });
        *self.listener.lock() = Some(handle);

        Ok(())
    }

    /// Returns whether the client is connected.
    pub fn is_connected(&self) -> bool {
        self.conn.is_connected()
    }

    /// Subscribes to server-pushed chat messages.
    pub fn subscribe_pushes(&self) -> broadcast::Receiver<String> {
        self.conn.subscribe_pushes()
    }

    /// Returns the logged-in username, if any.
    pub fn username(&self) -> Option<String> {
        self.session.lock().username().map(str::to_owned)
    }

    /// Returns whether a session is established.
    pub fn authenticated(&self) -> bool {
        self.session.lock().authenticated()
    }

    /// Closes the connection. Idempotent. The session is forcibly reset.
    pub async fn close(&self) {
        if let Some(handle) = self.listener.lock().take() {
            handle.abort();
        }
        self.conn.close().await;
        self.session.lock().clear();
    }

    // =========================================================================
    // Request dispatch
    // =========================================================================

    /// Sends a command and awaits its correlated response.
    ///
    /// On success returns the response args. Timeout leaves the connection
    /// usable for the next request; `Disconnected` resets the session and
    /// requires a reconnect.
    async fn dispatch(&self, action: Action, args: Vec<String>) -> Result<Vec<String>, ClientError> {
        let command = Command::new(action).with_args(args);

        // Arm before sending so the listener always has a waiter to deliver to
        let ticket = self.conn.mailbox().arm()?;

        if let Err(e) = self.conn.send(&command).await {
            self.conn.mailbox().disarm();
            if !e.is_recoverable() {
                self.session.lock().clear();
            }
            return Err(e);
        }

        let response = match tokio::time::timeout(self.conn.request_timeout(), ticket).await {
            Ok(Ok(response)) => response,
            Ok(Err(_)) => {
                // Sender dropped: the listener or close() shut the mailbox
                tracing::debug!(?action, "connection lost while awaiting response");
                self.session.lock().clear();
                return Err(ClientError::Disconnected);
            }
            Err(_) => {
                tracing::debug!(?action, "request timed out");
                self.conn.mailbox().disarm();
                return Err(ClientError::Timeout);
            }
        };

        match response.status {
            Status::Ok => Ok(response.args),
            Status::AuthFailure => Err(ClientError::Auth(first_or(
                response.args,
                "session expired",
            ))),
            Status::AppFailure => Err(ClientError::Application(first_or(
                response.args,
                "request failed",
            ))),
        }
    }

    /// Dispatches an action that requires a session, with the token prepended
    /// to the argument list. Fails fast locally when not logged in - nothing
    /// is sent.
    async fn dispatch_authed(
        &self,
        action: Action,
        args: Vec<String>,
    ) -> Result<Vec<String>, ClientError> {
        let token = self
            .session
            .lock()
            .token()
            .map(str::to_owned)
            .ok_or(ClientError::NotAuthenticated)?;

        let mut full = Vec::with_capacity(args.len() + 1);
        full.push(token);
        full.extend(args);
        self.dispatch(action, full).await
    }

    // =========================================================================
    // Accounts and sessions
    // =========================================================================

    /// Creates an account with the given username and password.
    pub async fn create_account(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.dispatch(
            Action::CreateAccount,
            vec![username.to_owned(), password.to_owned()],
        )
        .await?;
        Ok(())
    }

    /// Checks whether a username is taken.
    pub async fn username_exists(&self, username: &str) -> Result<bool, ClientError> {
        let args = self
            .dispatch(Action::UsernameExists, vec![username.to_owned()])
            .await?;
        Ok(args.first().map(String::as_str) == Some("1"))
    }

    /// Logs in, establishing a session.
    ///
    /// If a session is already established it is terminated first with an
    /// awaited logout; a failed logout aborts the new login attempt and the
    /// old session is kept.
    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        if self.session.lock().authenticated() {
            self.logout().await?;
        }

        let args = self
            .dispatch(Action::Login, vec![username.to_owned(), password.to_owned()])
            .await?;

        let token = args
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::BadResponse("login reply carried no session token".into()))?;

        self.session.lock().begin(username, token);
        Ok(())
    }

    /// Logs out, clearing the session. Fails fast locally when not logged in.
    pub async fn logout(&self) -> Result<(), ClientError> {
        self.dispatch_authed(Action::Logout, Vec::new()).await?;
        self.session.lock().clear();
        Ok(())
    }

    /// Deletes the logged-in account and clears the session.
    pub async fn delete_account(&self) -> Result<(), ClientError> {
        self.dispatch_authed(Action::DeleteAccount, Vec::new()).await?;
        self.session.lock().clear();
        Ok(())
    }

    // =========================================================================
    // Groups
    // =========================================================================

    /// Creates a group.
    pub async fn create_group(&self, group: &str) -> Result<(), ClientError> {
        self.dispatch(Action::CreateGroup, vec![group.to_owned()])
            .await?;
        Ok(())
    }

    /// Adds a user to a group.
    pub async fn add_user_to_group(&self, username: &str, group: &str) -> Result<(), ClientError> {
        self.dispatch(
            Action::AddToGroup,
            vec![username.to_owned(), group.to_owned()],
        )
        .await?;
        Ok(())
    }

    /// Adds the logged-in user to a group.
    pub async fn join_group(&self, group: &str) -> Result<(), ClientError> {
        let username = self.username().ok_or(ClientError::NotAuthenticated)?;
        self.add_user_to_group(&username, group).await
    }

    /// Lists users in a group (the group may contain wildcard characters).
    pub async fn users_in_group(&self, group: &str) -> Result<Vec<String>, ClientError> {
        self.dispatch(Action::GetUsersInGroup, vec![group.to_owned()])
            .await
    }

    /// Lists groups matching a wildcard query.
    pub async fn groups(&self, wildcard: &str) -> Result<Vec<String>, ClientError> {
        self.dispatch(Action::GetGroups, vec![wildcard.to_owned()])
            .await
    }

    // =========================================================================
    // Presence and messaging
    // =========================================================================

    /// Lists users currently online.
    pub async fn users_online(&self) -> Result<Vec<String>, ClientError> {
        self.dispatch(Action::UsersOnline, Vec::new()).await
    }

    /// Sends a direct message to a user.
    pub async fn send_user(&self, username: &str, message: &str) -> Result<(), ClientError> {
        self.dispatch_authed(
            Action::SendUser,
            vec![username.to_owned(), message.to_owned()],
        )
        .await?;
        Ok(())
    }

    /// Sends a message to a group.
    pub async fn send_group(&self, group: &str, message: &str) -> Result<(), ClientError> {
        self.dispatch_authed(
            Action::SendGroup,
            vec![group.to_owned(), message.to_owned()],
        )
        .await?;
        Ok(())
    }

    /// Fetches messages queued for the logged-in user.
    pub async fn fetch(&self) -> Result<Vec<String>, ClientError> {
        self.dispatch_authed(Action::Fetch, Vec::new()).await
    }
}

fn first_or(args: Vec<String>, default: &str) -> String {
    args.into_iter().next().unwrap_or_else(|| default.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RdtpClient::new(ConnectConfig::new("127.0.0.1:7667"));
        assert!(!client.is_connected());
        assert!(!client.authenticated());
        assert!(client.username().is_none());
    }

    #[tokio::test]
    async fn test_authed_actions_fail_fast_when_logged_out() {
        let client = RdtpClient::new(ConnectConfig::new("127.0.0.1:7667"));

        // No connection needed: the check is local and nothing is sent
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
        assert!(matches!(
            client.join_group("g").await,
            Err(ClientError::NotAuthenticated)
        ));
    }
}
