use std::fmt;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Warning,
    Info,
}

impl ToastKind {
    pub fn icon(self) -> &'static str {
        match self {
            Self::Success => "✓",
            Self::Error => "✗",
            Self::Warning => "!",
            Self::Info => "i",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub deadline: Instant,
}

impl fmt::Display for Toast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.icon(), self.message)
    }
}

/// Transient notifications. Each one disappears after its own duration 🍞
#[derive(Debug)]
pub struct Toasts {
    default_duration: Duration,
    active: Vec<Toast>,
}

impl Toasts {
    pub fn new(default_duration: Duration) -> Self {
        Self {
            default_duration,
            active: Vec::new(),
        }
    }

    pub fn show(&mut self, kind: ToastKind, message: &str) -> &Toast {
        self.show_for(kind, message, self.default_duration)
    }

    pub fn show_for(&mut self, kind: ToastKind, message: &str, duration: Duration) -> &Toast {
        self.active.push(Toast {
            kind,
            message: message.to_string(),
            deadline: Instant::now() + duration,
        });
        &self.active[self.active.len() - 1]
    }

    pub fn success(&mut self, message: &str) -> &Toast {
        self.show(ToastKind::Success, message)
    }

    pub fn warning(&mut self, message: &str) -> &Toast {
        self.show(ToastKind::Warning, message)
    }

    /// Called every tick to drop expired toasts
    pub fn on_tick(&mut self) {
        self.expire_at(Instant::now());
    }

    fn expire_at(&mut self, now: Instant) {
        self.active.retain(|t| t.deadline > now);
    }

    pub fn active(&self) -> &[Toast] {
        &self.active
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toasts_expire_independently() {
        let mut toasts = Toasts::new(Duration::from_secs(3));
        toasts.success("Login successful!");
        toasts.show_for(ToastKind::Error, "boom", Duration::from_millis(10));
        assert_eq!(toasts.active().len(), 2);

        toasts.expire_at(Instant::now() + Duration::from_secs(1));
        assert_eq!(toasts.active().len(), 1);
        assert_eq!(toasts.active()[0].kind, ToastKind::Success);

        toasts.expire_at(Instant::now() + Duration::from_secs(4));
        assert!(toasts.active().is_empty());
    }

    #[test]
    fn test_toast_display() {
        let mut toasts = Toasts::new(Duration::from_secs(3));
        let toast = toasts.warning("Careful");
        assert_eq!(toast.to_string(), "[!] Careful");
    }
}
