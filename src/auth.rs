use crate::config::Account;
use crate::diary_entry::UserId;
use crate::error::AuthError;
use crate::password_gate::sha256_hex;
use futures::future::BoxFuture;
use log::{info, warn};
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub email: String,
}

pub trait AuthProvider: Send + Sync {
    /// Live view of the signed-in user; `None` means no session.
    fn session(&self) -> watch::Receiver<Option<User>>;

    fn sign_in(&self, email: String, password: String) -> BoxFuture<'_, Result<User, AuthError>>;

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>>;
}

/// Checks credentials against the accounts listed in the config file.
pub struct LocalAuth {
    accounts: Vec<Account>,
    session: watch::Sender<Option<User>>,
}

impl LocalAuth {
    pub fn new(accounts: Vec<Account>) -> Self {
        let (session, _) = watch::channel(None);
        LocalAuth { accounts, session }
    }

    fn verify(&self, email: &str, password: &str) -> Option<User> {
        let digest = sha256_hex(password);
        self.accounts
            .iter()
            .find(|a| a.email.eq_ignore_ascii_case(email) && a.password_sha256 == digest)
            .map(|a| User {
                id: UserId::new(a.uid.clone()),
                email: a.email.clone(),
            })
    }
}

impl AuthProvider for LocalAuth {
    fn session(&self) -> watch::Receiver<Option<User>> {
        self.session.subscribe()
    }

    fn sign_in(&self, email: String, password: String) -> BoxFuture<'_, Result<User, AuthError>> {
        Box::pin(async move {
            match self.verify(email.trim(), &password) {
                Some(user) => {
                    info!("Signed in as {}", user.email);
                    self.session.send_replace(Some(user.clone()));
                    Ok(user)
                }
                None => {
                    warn!("Rejected sign-in for {}", email);
                    Err(AuthError::InvalidCredentials)
                }
            }
        })
    }

    fn sign_out(&self) -> BoxFuture<'_, Result<(), AuthError>> {
        Box::pin(async move {
            if let Some(user) = self.session.send_replace(None) {
                info!("Signed out {}", user.email);
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth() -> LocalAuth {
        LocalAuth::new(vec![Account {
            email: "me@example.com".into(),
            password_sha256: sha256_hex("hunter2"),
            uid: "u1".into(),
        }])
    }

    #[tokio::test]
    async fn session_starts_empty() {
        let auth = auth();
        assert!(auth.session().borrow().is_none());
    }

    #[tokio::test]
    async fn sign_in_publishes_the_user() {
        let auth = auth();
        let mut session = auth.session();
        let user = auth
            .sign_in("Me@Example.com".into(), "hunter2".into())
            .await
            .unwrap();
        assert_eq!(user.id, UserId::new("u1"));

        session.changed().await.unwrap();
        assert_eq!(session.borrow().as_ref(), Some(&user));
    }

    #[tokio::test]
    async fn wrong_password_leaves_session_empty() {
        let auth = auth();
        let err = auth
            .sign_in("me@example.com".into(), "nope".into())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(auth.session().borrow().is_none());
    }

    #[tokio::test]
    async fn sign_out_clears_the_session() {
        let auth = auth();
        auth.sign_in("me@example.com".into(), "hunter2".into())
            .await
            .unwrap();
        auth.sign_out().await.unwrap();
        assert!(auth.session().borrow().is_none());
    }
}
