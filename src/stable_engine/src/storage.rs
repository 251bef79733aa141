use crate::event::Event;

/// Append-only, CBOR-encoded event log.
///
/// The log lives inside the engine state so that a rolled-back operation
/// drops the events it appended along with its ledger writes. Every entry
/// decodes: entries are either written by [`EventLog::record_event`] or
/// checked by [`EventLog::from_entries`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventLog {
    entries: Vec<Vec<u8>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvalidEntry {
    pub index: usize,
    pub reason: String,
}

fn encode_event(event: &Event) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(event, &mut buf).expect("failed to encode an engine event");
    buf
}

fn try_decode_event(buf: &[u8]) -> Result<Event, String> {
    ciborium::de::from_reader(buf).map_err(|e| format!("{:?}", e))
}

fn decode_event(buf: &[u8]) -> Event {
    try_decode_event(buf).expect("failed to decode an engine event")
}

impl EventLog {
    /// Loads raw entries exported from another log, rejecting the first one
    /// that is not an engine event.
    pub fn from_entries(entries: Vec<Vec<u8>>) -> Result<Self, InvalidEntry> {
        for (index, bytes) in entries.iter().enumerate() {
            try_decode_event(bytes).map_err(|reason| InvalidEntry { index, reason })?;
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[Vec<u8>] {
        &self.entries
    }

    pub fn record_event(&mut self, event: &Event) {
        self.entries.push(encode_event(event));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry past `len`.
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    pub fn events(&self) -> impl Iterator<Item = Event> + '_ {
        self.entries.iter().map(|bytes| decode_event(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candid::Principal;
    use ethnum::U256;

    #[test]
    fn test_events_survive_encoding() {
        let mut log = EventLog::default();
        let event = Event::CollateralDeposited {
            user: Principal::from_slice(&[7]),
            asset: Principal::from_slice(&[8]),
            amount: U256::MAX,
        };
        log.record_event(&Event::Init { assets: vec![Principal::from_slice(&[8])] });
        log.record_event(&event);

        assert_eq!(log.len(), 2);
        assert_eq!(log.events().nth(1), Some(event));

        log.truncate(1);
        assert_eq!(log.len(), 1);
        assert!(matches!(log.events().next(), Some(Event::Init { .. })));
    }

    #[test]
    fn test_loading_entries_checks_every_one() {
        let mut log = EventLog::default();
        log.record_event(&Event::Init { assets: vec![Principal::from_slice(&[8])] });
        let exported = log.entries().to_vec();
        assert_eq!(EventLog::from_entries(exported.clone()), Ok(log.clone()));

        let mut corrupted = exported;
        corrupted.push(vec![0x01]);
        let err = EventLog::from_entries(corrupted).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(!err.reason.is_empty());
    }
}
