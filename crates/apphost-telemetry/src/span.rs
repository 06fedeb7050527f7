use tracing::Span;

/// Span covering work done on behalf of one app.
///
/// Events inside it carry `app` and `app_id` fields, which is how the
/// runtime correlates lifecycle logs of apps that share a process.
#[must_use]
pub fn app_span(app: &str, app_id: &str) -> Span {
    tracing::info_span!("app", app = %app, app_id = %app_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn span_without_subscriber_is_disabled() {
        let span = app_span("notes", "abc");
        assert!(span.is_disabled());
    }
}
