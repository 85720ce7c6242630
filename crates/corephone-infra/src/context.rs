//! Error-context annotation, mirroring the teacher's
//! `infra_common::errors::context`.

use std::fmt;

/// Where and during what an error occurred, for attaching to a log line or
/// a wrapped error's `Display` without growing the error enum itself.
#[derive(Debug, Clone)]
pub struct ErrorContext {
    /// Component the error occurred in, e.g. `"ice-transport"`.
    pub component: String,
    /// Operation being performed, e.g. `"negotiate"`.
    pub operation: String,
    /// Free-form extra detail.
    pub details: Option<String>,
}

impl ErrorContext {
    /// Build a context from a component and operation name.
    pub fn new<S: Into<String>, T: Into<String>>(component: S, operation: T) -> Self {
        Self {
            component: component.into(),
            operation: operation.into(),
            details: None,
        }
    }

    /// Attach free-form detail.
    pub fn with_details<S: Into<String>>(mut self, details: S) -> Self {
        self.details = Some(details.into());
        self
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "in component '{}' during operation '{}'",
            self.component, self.operation
        )?;
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        Ok(())
    }
}

/// Adds [`ErrorContext`] to a displayable error, producing an annotated
/// `String` suitable for logging (`tracing::error!("{}", err.annotate(ctx))`).
pub trait ErrorExt {
    /// Annotate `self` with `ctx`, returning a formatted string.
    fn annotate(&self, ctx: ErrorContext) -> String;
}

impl<E: fmt::Display> ErrorExt for E {
    fn annotate(&self, ctx: ErrorContext) -> String {
        format!("{self} [{ctx}]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn annotates_with_component_and_operation() {
        let ctx = ErrorContext::new("ice-transport", "negotiate").with_details("no pairs");
        let msg = "timed out".annotate(ctx);
        assert_eq!(
            msg,
            "timed out [in component 'ice-transport' during operation 'negotiate' (no pairs)]"
        );
    }
}
