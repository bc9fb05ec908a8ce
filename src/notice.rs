use std::sync::Mutex;

/// Surface for user-facing messages that are not tied to a form.
pub trait Notifier: Send + Sync {
    /// Shows a transient notice.
    fn toast(&self, message: &str);

    /// Shows a blocking alert.
    fn alert(&self, message: &str);
}

/// Notifier that writes to the tracing subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn toast(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn alert(&self, message: &str) {
        tracing::warn!("{message}");
    }
}

/// Notifier that keeps every message, for inspection.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    /// Toasts in arrival order.
    toasts: Mutex<Vec<String>>,
    /// Alerts in arrival order.
    alerts: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toasts received so far.
    pub fn toasts(&self) -> Vec<String> {
        self.toasts.lock().expect("toasts poisoned").clone()
    }

    /// Alerts received so far.
    pub fn alerts(&self) -> Vec<String> {
        self.alerts.lock().expect("alerts poisoned").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn toast(&self, message: &str) {
        self.toasts
            .lock()
            .expect("toasts poisoned")
            .push(message.to_string());
    }

    fn alert(&self, message: &str) {
        self.alerts
            .lock()
            .expect("alerts poisoned")
            .push(message.to_string());
    }
}
