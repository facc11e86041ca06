use std::collections::HashMap;

use super::types::Session;
use tokentrace_types::Event;

/// Session each event belongs to, by position.
///
/// An event with a `session_id` belongs to that session. An event without
/// one belongs to the session of the most recent event that had one; events
/// before any identified event belong to no session.
pub fn attribute_sessions(events: &[Event]) -> Vec<Option<&str>> {
    let mut current: Option<&str> = None;
    events
        .iter()
        .map(|event| {
            if let Some(id) = event.session_id.as_deref() {
                current = Some(id);
            }
            current
        })
        .collect()
}

/// Fold classified events into sessions.
///
/// Returns one Session per distinct id, in order of first appearance. Pure:
/// the same events always produce the same sessions.
pub fn reconstruct_sessions(events: &[Event]) -> Vec<Session> {
    let mut sessions: Vec<Session> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for (event, owner) in events.iter().zip(attribute_sessions(events)) {
        let Some(id) = owner else {
            continue;
        };
        let slot = *index.entry(id).or_insert_with(|| {
            sessions.push(Session::new(id.to_string()));
            sessions.len() - 1
        });
        sessions[slot].apply(event);
    }

    sessions
}
