//! Conversion diagnostics.
//!
//! Warnings and errors are logged through `tracing` and counted here so
//! callers (and tests) can inspect the outcome without a global sink.

/// Accumulates diagnostics for one conversion run.
#[derive(Debug, Default)]
pub struct ConversionReport {
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl ConversionReport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a recoverable problem. Conversion continues.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Record a non-fatal error.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{message}");
        self.errors.push(message);
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// True if any recorded warning contains the given fragment.
    pub fn has_warning(&self, fragment: &str) -> bool {
        self.warnings.iter().any(|w| w.contains(fragment))
    }

    /// Log the run summary.
    pub fn finish(&self) {
        tracing::info!(
            "Conversion finished: {} warning(s), {} error(s)",
            self.warnings.len(),
            self.errors.len()
        );
    }
}
