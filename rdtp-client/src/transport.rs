//! Transport selection.

use crate::client::RdtpClient;
use crate::error::ClientError;
use crate::rest::RestClient;
use tokio::sync::broadcast;

/// One chat backend, selected at construction.
///
/// Every operation delegates to the chosen backend; callers hold a
/// `ChatTransport` and never a concrete client.
pub enum ChatTransport {
    /// Persistent-socket backend with live push delivery.
    Rdtp(RdtpClient),
    /// Stateless HTTP backend; messages arrive only via `fetch`.
    Rest(RestClient),
}

impl ChatTransport {
    /// Subscribes to live push messages. `None` for backends without a push
    /// channel.
    pub fn subscribe_pushes(&self) -> Option<broadcast::Receiver<String>> {
        match self {
            ChatTransport::Rdtp(client) => Some(client.subscribe_pushes()),
            ChatTransport::Rest(_) => None,
        }
    }

    /// Returns the logged-in username, if any.
    pub fn username(&self) -> Option<String> {
        match self {
            ChatTransport::Rdtp(client) => client.username(),
            ChatTransport::Rest(client) => client.username(),
        }
    }

    /// Returns whether a session is established.
    pub fn authenticated(&self) -> bool {
        match self {
            ChatTransport::Rdtp(client) => client.authenticated(),
            ChatTransport::Rest(client) => client.authenticated(),
        }
    }

    /// Releases transport resources. Idempotent; a no-op for REST.
    pub async fn close(&self) {
        if let ChatTransport::Rdtp(client) = self {
            client.close().await;
        }
    }

    pub async fn create_account(&self, username: &str, password: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.create_account(username, password).await,
            ChatTransport::Rest(client) => client.create_account(username, password).await,
        }
    }

    pub async fn username_exists(&self, username: &str) -> Result<bool, ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.username_exists(username).await,
            ChatTransport::Rest(client) => client.username_exists(username).await,
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.login(username, password).await,
            ChatTransport::Rest(client) => client.login(username, password).await,
        }
    }

    pub async fn logout(&self) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.logout().await,
            ChatTransport::Rest(client) => client.logout().await,
        }
    }

    pub async fn delete_account(&self) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.delete_account().await,
            ChatTransport::Rest(client) => client.delete_account().await,
        }
    }

    pub async fn create_group(&self, group: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.create_group(group).await,
            ChatTransport::Rest(client) => client.create_group(group).await,
        }
    }

    pub async fn add_user_to_group(&self, username: &str, group: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.add_user_to_group(username, group).await,
            ChatTransport::Rest(client) => client.add_user_to_group(username, group).await,
        }
    }

    pub async fn join_group(&self, group: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.join_group(group).await,
            ChatTransport::Rest(client) => client.join_group(group).await,
        }
    }

    pub async fn users_in_group(&self, group: &str) -> Result<Vec<String>, ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.users_in_group(group).await,
            ChatTransport::Rest(client) => client.users_in_group(group).await,
        }
    }

    pub async fn groups(&self, wildcard: &str) -> Result<Vec<String>, ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.groups(wildcard).await,
            ChatTransport::Rest(client) => client.groups(wildcard).await,
        }
    }

    pub async fn users_online(&self) -> Result<Vec<String>, ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.users_online().await,
            ChatTransport::Rest(client) => client.users_online().await,
        }
    }

    pub async fn send_user(&self, username: &str, message: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.send_user(username, message).await,
            ChatTransport::Rest(client) => client.send_user(username, message).await,
        }
    }

    pub async fn send_group(&self, group: &str, message: &str) -> Result<(), ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.send_group(group, message).await,
            ChatTransport::Rest(client) => client.send_group(group, message).await,
        }
    }

    pub async fn fetch(&self) -> Result<Vec<String>, ClientError> {
        match self {
            ChatTransport::Rdtp(client) => client.fetch().await,
            ChatTransport::Rest(client) => client.fetch().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectConfig;

    #[test]
    fn test_push_channel_availability() {
        let rdtp = ChatTransport::Rdtp(RdtpClient::new(ConnectConfig::new("127.0.0.1:7667")));
        assert!(rdtp.subscribe_pushes().is_some());

        let rest = ChatTransport::Rest(RestClient::new("http://127.0.0.1:5000").unwrap());
        assert!(rest.subscribe_pushes().is_none());
    }
}
