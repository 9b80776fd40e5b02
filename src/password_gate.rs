use crate::error::IncorrectPassword;
use log::{debug, warn};
use sha2::{Digest, Sha256};

pub fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Holds a protected action until the right password is entered.
#[derive(Debug)]
pub struct PasswordGate<A> {
    digest: Option<String>,
    pending: Option<A>,
}

impl<A> PasswordGate<A> {
    pub fn new(digest: Option<String>) -> Self {
        PasswordGate {
            digest: digest.map(|d| d.trim().to_ascii_lowercase()),
            pending: None,
        }
    }

    /// Hands `action` straight back when no password is configured.
    /// Otherwise parks it (replacing any earlier one) and opens the prompt.
    pub fn request(&mut self, action: A) -> Option<A> {
        if self.digest.is_none() {
            return Some(action);
        }
        debug!("Password required, prompting");
        self.pending = Some(action);
        None
    }

    pub fn is_prompting(&self) -> bool {
        self.pending.is_some()
    }

    /// Releases the parked action on a matching password. A mismatch keeps
    /// the prompt open with the action still parked.
    pub fn submit(&mut self, password: &str) -> Result<Option<A>, IncorrectPassword> {
        let Some(expected) = &self.digest else {
            return Ok(self.pending.take());
        };
        if sha256_hex(password) != *expected {
            warn!("Incorrect password for protected action");
            return Err(IncorrectPassword);
        }
        Ok(self.pending.take())
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_lowercase_hex() {
        assert_eq!(
            sha256_hex("abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn without_password_actions_pass_through() {
        let mut gate = PasswordGate::new(None);
        assert_eq!(gate.request("upload"), Some("upload"));
        assert!(!gate.is_prompting());
    }

    #[test]
    fn correct_password_releases_action() {
        let mut gate = PasswordGate::new(Some(sha256_hex("secret")));
        assert_eq!(gate.request("upload"), None);
        assert!(gate.is_prompting());
        assert_eq!(gate.submit("secret"), Ok(Some("upload")));
        assert!(!gate.is_prompting());
    }

    #[test]
    fn wrong_password_changes_nothing() {
        let mut gate = PasswordGate::new(Some(sha256_hex("secret")));
        gate.request("upload");
        assert_eq!(gate.submit("guess"), Err(IncorrectPassword));
        assert!(gate.is_prompting());
        assert_eq!(gate.submit("secret"), Ok(Some("upload")));
    }

    #[test]
    fn later_request_replaces_parked_action() {
        let mut gate = PasswordGate::new(Some(sha256_hex("secret")));
        gate.request("upload");
        gate.request("delete");
        assert_eq!(gate.submit("secret"), Ok(Some("delete")));
    }

    #[test]
    fn cancel_drops_the_action() {
        let mut gate = PasswordGate::new(Some(sha256_hex("secret")));
        gate.request("upload");
        gate.cancel();
        assert_eq!(gate.submit("secret"), Ok(None));
    }
}
