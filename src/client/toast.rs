//! Single-slot toast notifications.

use std::fmt;

/// Visual style of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

impl fmt::Display for ToastKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Error => "error",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
}

/// Holds at most one toast. A new toast replaces the visible one.
#[derive(Debug, Clone, Default)]
pub struct ToastSlot {
    current: Option<Toast>,
    unseen: bool,
}

impl ToastSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.current = Some(Toast {
            message: message.into(),
            kind,
        });
        self.unseen = true;
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.show(ToastKind::Error, message);
    }

    /// Hide the visible toast, returning it.
    pub fn dismiss(&mut self) -> Option<Toast> {
        self.unseen = false;
        self.current.take()
    }

    #[must_use]
    pub fn current(&self) -> Option<&Toast> {
        self.current.as_ref()
    }

    /// Returns the visible toast once after each `show`.
    pub fn take_unseen(&mut self) -> Option<&Toast> {
        if std::mem::take(&mut self.unseen) {
            self.current.as_ref()
        } else {
            None
        }
    }
}
