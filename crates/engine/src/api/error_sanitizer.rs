//! Error sanitization for client-facing messages.
//!
//! Prevents leaking internal details (store URLs, SQL, panic text) to the game.
//! The full error is logged with the delivery's correlation id; the client only
//! sees one of the fixed response texts.

use krazyplanet_shared::responses::text;

use crate::infrastructure::correlation::CorrelationId;

/// Log a repository error and return the text the client should see.
pub fn sanitize_repo_error<E: std::fmt::Display>(
    error: &E,
    operation: &str,
    correlation_id: &CorrelationId,
    client_message: &'static str,
) -> &'static str {
    tracing::error!(
        error = %error,
        operation = operation,
        correlation_id = %correlation_id,
        correlation_id_short = %correlation_id.short(),
        "Repository error"
    );

    client_message
}

/// Log an unexpected failure and return the generic internal error text.
pub fn sanitize_error<E: std::fmt::Display>(
    error: &E,
    context: &str,
    correlation_id: &CorrelationId,
) -> &'static str {
    tracing::error!(
        error = %error,
        context = context,
        correlation_id = %correlation_id,
        "Internal error occurred"
    );

    text::INTERNAL_ERROR
}

/// Readable text of a panic payload.
pub fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::ports::RepoError;

    #[test]
    fn repo_error_detail_is_not_returned() {
        let error = RepoError::database("insert_exchange", "https://secret-db.turso.io refused");
        let cid = CorrelationId::new();

        let message = sanitize_repo_error(&error, "insert_exchange", &cid, text::EXCHANGE_CREATE_FAILED);

        assert_eq!(message, "Failed to create exchange in database");
        assert!(!message.contains("turso"));
    }

    #[test]
    fn internal_error_is_generic() {
        let cid = CorrelationId::new();
        assert_eq!(
            sanitize_error(&"index out of bounds", "exchange.query", &cid),
            "Internal server error"
        );
    }

    #[test]
    fn panic_payloads_are_readable() {
        let from_str: Box<dyn std::any::Any + Send> = Box::new("boom");
        let from_string: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        let other: Box<dyn std::any::Any + Send> = Box::new(7_u8);

        assert_eq!(panic_message(from_str.as_ref()), "boom");
        assert_eq!(panic_message(from_string.as_ref()), "bang");
        assert_eq!(panic_message(other.as_ref()), "unknown panic");
    }
}
