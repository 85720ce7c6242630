//! The persisted call history record and its wire line format (§6).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::call::Call;
use crate::error::CallError;
use crate::state::HistoryState;
use crate::Result;

const FIELD_COUNT: usize = 10;

/// A terminated call's history-log row. Built once, at `Over`, from a
/// [`Call`]'s final attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub state: HistoryState,
    pub peer_number: String,
    pub peer_name: String,
    pub start_ts: Option<DateTime<Utc>>,
    pub stop_ts: Option<DateTime<Utc>>,
    pub call_id: Uuid,
    pub account_id: String,
    pub recording_path: Option<String>,
    pub conf_id: Option<Uuid>,
    pub added_ts: DateTime<Utc>,
}

impl HistoryEntry {
    /// Snapshot `call` into a history row. Callers typically do this
    /// right after a call reaches `Over`.
    pub fn from_call(call: &Call) -> Self {
        Self {
            state: call.history_state(),
            peer_number: call.peer_number().to_string(),
            peer_name: call.peer_name().to_string(),
            start_ts: call.start_ts(),
            stop_ts: call.stop_ts(),
            call_id: call.id(),
            account_id: call.account_id().to_string(),
            recording_path: call.recording_path().map(str::to_string),
            conf_id: call.parent_conference(),
            added_ts: call.added_ts(),
        }
    }

    fn state_wire(&self) -> &'static str {
        match self.state {
            HistoryState::None => "none",
            HistoryState::Incoming => "incoming",
            HistoryState::Outgoing => "outgoing",
            HistoryState::Missed => "missed",
        }
    }

    fn state_from_wire(s: &str) -> Result<HistoryState> {
        match s {
            "none" => Ok(HistoryState::None),
            "incoming" => Ok(HistoryState::Incoming),
            "outgoing" => Ok(HistoryState::Outgoing),
            "missed" => Ok(HistoryState::Missed),
            other => Err(CallError::MalformedHistoryRecord(format!(
                "unknown history state {other:?}"
            ))),
        }
    }

    /// Serialise to the persisted pipe-delimited line format:
    /// `state|peer_number|peer_name|start_ts|stop_ts|call_id|account_id|recording_path|conf_id|added_ts`.
    /// Empty/absent optional fields are written as an empty segment.
    pub fn to_line(&self) -> String {
        let fmt_ts = |ts: &Option<DateTime<Utc>>| ts.map(|t| t.to_rfc3339()).unwrap_or_default();
        format!(
            "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
            self.state_wire(),
            self.peer_number,
            self.peer_name,
            fmt_ts(&self.start_ts),
            fmt_ts(&self.stop_ts),
            self.call_id,
            self.account_id,
            self.recording_path.as_deref().unwrap_or(""),
            self.conf_id.map(|id| id.to_string()).unwrap_or_default(),
            self.added_ts.to_rfc3339(),
        )
    }

    /// Parse one persisted line back into an entry.
    pub fn parse_line(line: &str) -> Result<Self> {
        let fields: Vec<&str> = line.split('|').collect();
        if fields.len() != FIELD_COUNT {
            return Err(CallError::MalformedHistoryRecord(format!(
                "expected {FIELD_COUNT} fields, got {}",
                fields.len()
            )));
        }
        let parse_ts = |s: &str| -> Result<Option<DateTime<Utc>>> {
            if s.is_empty() {
                Ok(None)
            } else {
                DateTime::parse_from_rfc3339(s)
                    .map(|dt| Some(dt.with_timezone(&Utc)))
                    .map_err(|e| CallError::MalformedHistoryRecord(e.to_string()))
            }
        };
        let parse_uuid = |s: &str| -> Result<Uuid> {
            Uuid::parse_str(s).map_err(|e| CallError::MalformedHistoryRecord(e.to_string()))
        };

        Ok(Self {
            state: Self::state_from_wire(fields[0])?,
            peer_number: fields[1].to_string(),
            peer_name: fields[2].to_string(),
            start_ts: parse_ts(fields[3])?,
            stop_ts: parse_ts(fields[4])?,
            call_id: parse_uuid(fields[5])?,
            account_id: fields[6].to_string(),
            recording_path: (!fields[7].is_empty()).then(|| fields[7].to_string()),
            conf_id: (!fields[8].is_empty()).then(|| parse_uuid(fields[8])).transpose()?,
            added_ts: DateTime::parse_from_rfc3339(fields[9])
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| CallError::MalformedHistoryRecord(e.to_string()))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_through_the_line_format() {
        let entry = HistoryEntry {
            state: HistoryState::Outgoing,
            peer_number: "+15551234".to_string(),
            peer_name: "Alice".to_string(),
            start_ts: Some(Utc::now()),
            stop_ts: Some(Utc::now()),
            call_id: Uuid::new_v4(),
            account_id: "acc1".to_string(),
            recording_path: None,
            conf_id: None,
            added_ts: Utc::now(),
        };
        let line = entry.to_line();
        let parsed = HistoryEntry::parse_line(&line).unwrap();
        assert_eq!(parsed, entry);
    }

    #[test]
    fn rejects_a_line_with_the_wrong_field_count() {
        assert!(HistoryEntry::parse_line("only|two").is_err());
    }
}
