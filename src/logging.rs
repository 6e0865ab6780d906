//! Tracing setup and the diagnostics buffer.
//!
//! Warnings and errors are captured into a bounded in-memory buffer so the
//! interactive shell can show recent failures on demand, the way a browser
//! console would.

use parking_lot::RwLock;
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::Layer;

/// A captured warning or error
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub level: Level,
    pub target: String,
    pub message: String,
}

impl Diagnostic {
    /// Format as a string for display
    pub fn format(&self) -> String {
        format!(
            "{} {} [{}] {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
            self.level,
            self.target,
            self.message
        )
    }
}

/// Ring buffer of recent diagnostics
pub struct DiagnosticsBuffer {
    recent: RwLock<VecDeque<Diagnostic>>,
    max_entries: usize,
}

impl DiagnosticsBuffer {
    pub fn new(max_entries: usize) -> Self {
        Self {
            recent: RwLock::new(VecDeque::with_capacity(max_entries)),
            max_entries,
        }
    }

    pub fn push(&self, entry: Diagnostic) {
        let mut recent = self.recent.write();
        if recent.len() >= self.max_entries {
            recent.pop_front();
        }
        recent.push_back(entry);
    }

    /// Up to `count` most recent entries, oldest first
    pub fn get_recent(&self, count: usize) -> Vec<Diagnostic> {
        let recent = self.recent.read();
        let start = recent.len().saturating_sub(count);
        recent.iter().skip(start).cloned().collect()
    }

    pub fn clear(&self) {
        self.recent.write().clear();
    }
}

pub type SharedDiagnostics = Arc<DiagnosticsBuffer>;

pub fn create_diagnostics_buffer(max_entries: usize) -> SharedDiagnostics {
    Arc::new(DiagnosticsBuffer::new(max_entries))
}

/// Tracing layer that copies WARN and ERROR events into the buffer
pub struct DiagnosticsLayer {
    buffer: SharedDiagnostics,
}

impl DiagnosticsLayer {
    pub fn new(buffer: SharedDiagnostics) -> Self {
        Self { buffer }
    }
}

impl<S> Layer<S> for DiagnosticsLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let level = *event.metadata().level();
        if level > Level::WARN {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.buffer.push(Diagnostic {
            timestamp: chrono::Utc::now(),
            level,
            target: event.metadata().target().to_string(),
            message: visitor.message,
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
}

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else if self.message.is_empty() {
            self.message = format!("{}={:?}", field.name(), value);
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else if self.message.is_empty() {
            self.message = format!("{}={}", field.name(), value);
        }
    }
}

/// Install the global subscriber: fmt output on stderr plus the buffer.
pub fn init(verbose: bool, buffer: SharedDiagnostics) {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_filter(level),
        )
        .with(DiagnosticsLayer::new(buffer))
        .init();
}
