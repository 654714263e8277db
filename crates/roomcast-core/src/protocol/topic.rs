//! Backbone subject naming.
//!
//! Outbound client actions go to `room.<room>.action`; the gateway listens on
//! `room.*.update` and routes by the second segment.

/// Subscription pattern for inbound room updates.
pub const UPDATE_PATTERN: &str = "room.*.update";

/// Subject an action for `room` is published on.
pub fn action_subject(room: &str) -> String {
    format!("room.{room}.action")
}

/// Subject producers publish updates for `room` on.
pub fn update_subject(room: &str) -> String {
    format!("room.{room}.update")
}

/// Extract the room name from an inbound update subject.
///
/// Subjects with fewer than three segments are malformed.
pub fn room_from_subject(subject: &str) -> Option<&str> {
    let mut parts = subject.split('.');
    let _prefix = parts.next()?;
    let room = parts.next()?;
    parts.next()?;
    Some(room)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn room_is_second_segment() {
        assert_eq!(room_from_subject("room.lobby.update"), Some("lobby"));
        assert_eq!(room_from_subject(&update_subject("r-7")), Some("r-7"));
    }

    #[test]
    fn short_subjects_are_rejected() {
        assert_eq!(room_from_subject("room.lobby"), None);
        assert_eq!(room_from_subject("room"), None);
        assert_eq!(room_from_subject(""), None);
    }

    #[test]
    fn action_subject_format() {
        assert_eq!(action_subject("lobby"), "room.lobby.action");
    }
}
