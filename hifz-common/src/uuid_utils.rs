//! UUID utilities

use uuid::Uuid;

/// Generate a new UUIDv4
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse UUID from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s)
}

/// Deterministic client event id for a protocol step submission.
///
/// Derived (UUIDv5) from the session, ayah, step and attempt so that a client
/// retry of the same step dedupes against the unique
/// `(user_id, client_event_id)` index instead of double-recording.
pub fn step_event_id(session_id: Uuid, ayah_id: i64, step: &str, attempt: i64) -> Uuid {
    let name = format!("{}:{}:{}:{}", session_id, ayah_id, step, attempt);
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_event_id_deterministic() {
        let session = generate();
        let a = step_event_id(session, 5, "BLIND", 2);
        let b = step_event_id(session, 5, "BLIND", 2);
        assert_eq!(a, b);
    }

    #[test]
    fn test_step_event_id_distinct_inputs() {
        let session = generate();
        let base = step_event_id(session, 5, "BLIND", 2);
        assert_ne!(base, step_event_id(session, 5, "BLIND", 3));
        assert_ne!(base, step_event_id(session, 5, "LINK", 2));
        assert_ne!(base, step_event_id(session, 6, "BLIND", 2));
        assert_ne!(base, step_event_id(generate(), 5, "BLIND", 2));
    }
}
