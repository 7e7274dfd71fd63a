//! REPL command parsing and execution.

use colored::Colorize;
use rdtp_client::{ChatTransport, ClientError};

const HELP_TEXT: &str = r#"
Available commands:
  help                            Show this help
  register <user> <password>      Create a new account
  login <user> <password>         Log in
  logout                          Log out

  users_online                    List users currently online
  send_user <user> <message>      Send a direct message
  fetch                           Fetch messages queued for you

  create_group <group>            Create a group
  join_group <group>              Join a group
  add_user_to_group <user> <group>  Add a user to a group
  users_in_group <group>          List users in a group
  get_groups [query]              List groups (wildcards allowed)
  send_group <group> <message>    Send a message to a group

  delete_account                  Delete your account
  quit, exit                      Exit
"#;

/// Executes one REPL line. Returns `Ok(None)` on an exit command.
pub async fn execute(
    transport: &ChatTransport,
    line: &str,
) -> Result<Option<String>, ClientError> {
    let (cmd, rest) = split_command(line);

    match cmd.to_lowercase().as_str() {
        "help" | "?" => Ok(Some(HELP_TEXT.to_string())),

        "quit" | "exit" | "q" => Ok(None),

        "register" => match two_words(rest) {
            Some((username, password)) => {
                transport.create_account(username, password).await?;
                Ok(Some(format!(
                    "{} You can now login.",
                    "Account created.".green()
                )))
            }
            None => Ok(Some("Usage: register <user> <password>".to_string())),
        },

        "login" => match two_words(rest) {
            Some((username, password)) => {
                transport.login(username, password).await?;
                Ok(Some(format!("Logged in as {}.", username.cyan())))
            }
            None => Ok(Some("Usage: login <user> <password>".to_string())),
        },

        "logout" => {
            transport.logout().await?;
            Ok(Some("Logged out.".to_string()))
        }

        "users_online" => {
            let users = transport.users_online().await?;
            if users.is_empty() {
                Ok(Some("No users are logged in.".yellow().to_string()))
            } else {
                Ok(Some(format!(
                    "There are {} users logged in: {}",
                    users.len(),
                    users.join(", ").cyan()
                )))
            }
        }

        "send_user" => match word_then_text(rest) {
            Some((username, message)) => {
                transport.send_user(username, message).await?;
                Ok(Some(format!("Message sent to {}.", username.cyan())))
            }
            None => Ok(Some("Usage: send_user <user> <message>".to_string())),
        },

        "send_group" => match word_then_text(rest) {
            Some((group, message)) => {
                transport.send_group(group, message).await?;
                Ok(Some(format!("Message sent to group {}.", group.cyan())))
            }
            None => Ok(Some("Usage: send_group <group> <message>".to_string())),
        },

        "fetch" => {
            let messages = transport.fetch().await?;
            if messages.is_empty() {
                Ok(Some("No new messages.".yellow().to_string()))
            } else {
                Ok(Some(messages.join("\n")))
            }
        }

        "create_group" => match one_word(rest) {
            Some(group) => {
                transport.create_group(group).await?;
                Ok(Some(format!("{} {}", "Created group".green(), group.cyan())))
            }
            None => Ok(Some("Usage: create_group <group>".to_string())),
        },

        "join_group" => match one_word(rest) {
            Some(group) => {
                transport.join_group(group).await?;
                Ok(Some(format!("Joined group {}.", group.cyan())))
            }
            None => Ok(Some("Usage: join_group <group>".to_string())),
        },

        "add_user_to_group" => match two_words(rest) {
            Some((username, group)) => {
                transport.add_user_to_group(username, group).await?;
                Ok(Some(format!(
                    "Added {} to group {}.",
                    username.cyan(),
                    group.cyan()
                )))
            }
            None => Ok(Some(
                "Usage: add_user_to_group <user> <group>".to_string(),
            )),
        },

        "users_in_group" => match one_word(rest) {
            Some(group) => {
                let users = transport.users_in_group(group).await?;
                if users.is_empty() {
                    Ok(Some(format!("No users in group {}.", group.cyan())))
                } else {
                    Ok(Some(format!(
                        "Users in group {}: {}",
                        group.cyan(),
                        users.join(", ")
                    )))
                }
            }
            None => Ok(Some("Usage: users_in_group <group>".to_string())),
        },

        "get_groups" => {
            let wildcard = one_word(rest).unwrap_or("*");
            let groups = transport.groups(wildcard).await?;
            if groups.is_empty() {
                Ok(Some("No groups found.".yellow().to_string()))
            } else {
                Ok(Some(groups.join("\n")))
            }
        }

        "delete_account" => {
            transport.delete_account().await?;
            Ok(Some("Account deleted.".to_string()))
        }

        _ => Ok(Some(format!(
            "Unknown command: {}. Type 'help' for help.",
            cmd
        ))),
    }
}

/// Splits a line into the command verb and the remainder.
fn split_command(line: &str) -> (&str, &str) {
    match line.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, rest.trim()),
        None => (line, ""),
    }
}

/// Exactly one word.
fn one_word(rest: &str) -> Option<&str> {
    let mut words = rest.split_whitespace();
    match (words.next(), words.next()) {
        (Some(word), None) => Some(word),
        _ => None,
    }
}

/// Exactly two words.
fn two_words(rest: &str) -> Option<(&str, &str)> {
    let mut words = rest.split_whitespace();
    match (words.next(), words.next(), words.next()) {
        (Some(a), Some(b), None) => Some((a, b)),
        _ => None,
    }
}

/// One word followed by free text (the message body keeps its spacing).
fn word_then_text(rest: &str) -> Option<(&str, &str)> {
    let (word, text) = rest.split_once(char::is_whitespace)?;
    let text = text.trim_start();
    if text.is_empty() {
        return None;
    }
    Some((word, text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rdtp_client::RestClient;

    #[test]
    fn test_split_command() {
        assert_eq!(split_command("login alice pw"), ("login", "alice pw"));
        assert_eq!(split_command("fetch"), ("fetch", ""));
    }

    #[test]
    fn test_arity_helpers() {
        assert_eq!(one_word("ops"), Some("ops"));
        assert_eq!(one_word("ops extra"), None);
        assert_eq!(one_word(""), None);

        assert_eq!(two_words("alice pw"), Some(("alice", "pw")));
        assert_eq!(two_words("alice"), None);
        assert_eq!(two_words("a b c"), None);

        assert_eq!(
            word_then_text("bob hello there  friend"),
            Some(("bob", "hello there  friend"))
        );
        assert_eq!(word_then_text("bob"), None);
        assert_eq!(word_then_text("bob   "), None);
    }

    #[tokio::test]
    async fn test_bad_arity_prints_usage_without_dispatching() {
        // Unreachable backend: commands below must not touch the network
        let transport = ChatTransport::Rest(RestClient::new("http://127.0.0.1:1").unwrap());

        let out = execute(&transport, "register onlyone").await.unwrap();
        assert!(out.unwrap().starts_with("Usage: register"));

        let out = execute(&transport, "send_user bob").await.unwrap();
        assert!(out.unwrap().starts_with("Usage: send_user"));

        let out = execute(&transport, "frobnicate").await.unwrap();
        assert!(out.unwrap().starts_with("Unknown command"));

        let out = execute(&transport, "quit").await.unwrap();
        assert!(out.is_none());
    }
}
