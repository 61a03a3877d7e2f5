use serde::{Deserialize, Serialize};

/// Events emitted by a persisted collection after a mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreEvent {
    /// The in-memory value changed and was written to the durable store.
    Committed { key: String },
    /// The in-memory value changed but the durable write was rejected.
    WriteFailed { key: String, reason: String },
}

impl StoreEvent {
    /// Storage key of the collection that emitted the event.
    pub fn key(&self) -> &str {
        match self {
            Self::Committed { key } | Self::WriteFailed { key, .. } => key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_serde_round_trip() {
        let events = vec![
            StoreEvent::Committed {
                key: "favorites".into(),
            },
            StoreEvent::WriteFailed {
                key: "movie-history".into(),
                reason: "quota exceeded".into(),
            },
        ];
        for e in &events {
            let json = serde_json::to_string(e).unwrap();
            let back: StoreEvent = serde_json::from_str(&json).unwrap();
            assert_eq!(*e, back);
        }
        assert_eq!(events[1].key(), "movie-history");
    }
}
