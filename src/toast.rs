use std::time::{Duration, Instant};

const TOAST_DURATION: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Info,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub title: String,
    pub message: String,
    pub kind: ToastKind,
    pub created: Instant,
    pub duration: Duration,
}

impl Toast {
    pub fn new(kind: ToastKind, title: impl Into<String>, message: impl Into<String>) -> Toast {
        Toast {
            title: title.into(),
            message: message.into(),
            kind,
            created: Instant::now(),
            duration: TOAST_DURATION,
        }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created) >= self.duration
    }
}

/// Non-blocking notices, newest last.
#[derive(Debug, Default)]
pub struct Toasts {
    toasts: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, toast: Toast) {
        match toast.kind {
            ToastKind::Error => log::warn!("{}: {}", toast.title, toast.message),
            _ => log::info!("{}: {}", toast.title, toast.message),
        }
        self.toasts.push(toast);
    }

    pub fn success(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Success, title, message));
    }

    pub fn info(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Info, title, message));
    }

    pub fn error(&mut self, title: impl Into<String>, message: impl Into<String>) {
        self.push(Toast::new(ToastKind::Error, title, message));
    }

    pub fn prune(&mut self, now: Instant) {
        self.toasts.retain(|t| !t.is_expired(now));
    }

    pub fn latest(&self) -> Option<&Toast> {
        self.toasts.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expired_toasts_are_pruned() {
        let mut toasts = Toasts::default();
        toasts.error("Upload Failed", "There was an error uploading your image.");
        let created = toasts.latest().unwrap().created;

        toasts.prune(created + Duration::from_secs(1));
        assert!(toasts.latest().is_some());

        toasts.prune(created + TOAST_DURATION);
        assert!(toasts.latest().is_none());
    }

    #[test]
    fn latest_is_most_recent() {
        let mut toasts = Toasts::default();
        toasts.info("a", "first");
        toasts.success("b", "second");
        assert_eq!(toasts.latest().unwrap().message, "second");
        assert_eq!(toasts.latest().unwrap().kind, ToastKind::Success);
    }
}
