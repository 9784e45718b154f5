//! CSV export and import of events.
//!
//! Each row carries a few readable columns plus the full event snapshot as
//! JSON in `metadata`; only the snapshot is read back on import.

use std::io::{Read, Write};

use csv::{QuoteStyle, ReaderBuilder, StringRecord, WriterBuilder};
use thiserror::Error;

use crate::event::Event;

/// Column names, in export order.
pub const HEADER: [&str; 6] = ["id", "type", "timestamp", "caregiverId", "note", "metadata"];

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("file appears to be empty")]
    EmptyFile,

    #[error("invalid CSV format: missing column(s) {}", .missing.join(", "))]
    InvalidHeader { missing: Vec<String> },

    #[error("no valid events found in file ({errors} rows had errors)")]
    NoValidRows { errors: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A data row that could not be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 1-based data row number, not counting the header or blank lines.
    pub row: usize,
    pub message: String,
}

/// Events parsed from a file, plus the rows that were skipped.
#[derive(Debug)]
pub struct ImportReport {
    pub events: Vec<Event>,
    /// Data row number of each entry in `events`.
    pub event_rows: Vec<usize>,
    pub row_errors: Vec<RowError>,
}

/// Writes `events` as CSV, in the order given, with every field quoted.
pub fn write_events<W: Write>(writer: W, events: &[Event]) -> Result<(), TransferError> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .from_writer(writer);
    wtr.write_record(HEADER)?;

    for event in events {
        let metadata = serde_json::to_string(event)?;
        let timestamp = event.timestamp.to_rfc3339();
        wtr.write_record([
            event.id.as_str(),
            event.event_type().as_str(),
            timestamp.as_str(),
            event.caregiver_id.as_str(),
            event.note.as_deref().unwrap_or(""),
            metadata.as_str(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Parses an exported CSV file.
///
/// Header problems and files without data fail outright. Bad data rows are
/// collected in [`ImportReport::row_errors`] and skipped; if no row survives
/// the whole import fails with [`TransferError::NoValidRows`].
pub fn read_events<R: Read>(reader: R) -> Result<ImportReport, TransferError> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);
    let mut records = rdr.records();

    let header = match records.next() {
        Some(record) => record?,
        None => return Err(TransferError::EmptyFile),
    };
    let columns: Vec<String> = header.iter().map(|c| c.trim().to_string()).collect();
    let missing: Vec<String> = HEADER
        .iter()
        .filter(|name| !columns.iter().any(|c| c == *name))
        .map(|name| (*name).to_string())
        .collect();
    if !missing.is_empty() {
        return Err(TransferError::InvalidHeader { missing });
    }
    let metadata_index = columns
        .iter()
        .position(|c| c == "metadata")
        .ok_or_else(|| TransferError::InvalidHeader {
            missing: vec!["metadata".to_string()],
        })?;

    let mut events = Vec::new();
    let mut event_rows = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows = 0;
    for (index, record) in records.enumerate() {
        rows += 1;
        let row = index + 1;
        match record
            .map_err(|e| e.to_string())
            .and_then(|record| parse_row(&record, columns.len(), metadata_index))
        {
            Ok(event) => {
                events.push(event);
                event_rows.push(row);
            }
            Err(message) => row_errors.push(RowError { row, message }),
        }
    }

    if rows == 0 {
        return Err(TransferError::EmptyFile);
    }
    if events.is_empty() {
        return Err(TransferError::NoValidRows {
            errors: row_errors.len(),
        });
    }
    Ok(ImportReport {
        events,
        event_rows,
        row_errors,
    })
}

fn parse_row(
    record: &StringRecord,
    expected: usize,
    metadata_index: usize,
) -> Result<Event, String> {
    if record.len() != expected {
        return Err(format!("has {} columns, expected {expected}", record.len()));
    }
    let metadata = record.get(metadata_index).unwrap_or_default();
    let event: Event =
        serde_json::from_str(metadata).map_err(|e| format!("invalid metadata: {e}"))?;
    event.kind.validate().map_err(|e| e.to_string())?;
    Ok(event)
}

#[cfg(test)]
mod tests {
    use super::*;

    use chrono::{DateTime, Utc};

    use crate::event::{EventKind, FeedingMethod, NewEvent};
    use crate::session::Session;
    use crate::types::{BabyId, CaregiverId};

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn sample_events() -> Vec<Event> {
        let session = Session::new(
            BabyId::new("baby-1").unwrap(),
            CaregiverId::new("local-user").unwrap(),
        );
        let now = ts("2025-03-01T08:00:00Z");
        vec![
            NewEvent::new(EventKind::feed_amount(FeedingMethod::Bottle, Some(3.5), None))
            .with_note(Some("said \"more\"".to_string()))
            .into_event(&session, now),
            NewEvent::new(EventKind::Sleep {
                duration_minutes: 40,
            })
            .at(ts("2025-03-01T06:00:00Z"))
            .into_event(&session, now),
        ]
    }

    fn export(events: &[Event]) -> String {
        let mut out = Vec::new();
        write_events(&mut out, events).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn export_quotes_every_field() {
        let csv = export(&[]);
        assert_eq!(
            csv,
            "\"id\",\"type\",\"timestamp\",\"caregiverId\",\"note\",\"metadata\"\n"
        );

        let csv = export(&sample_events());
        let first_row = csv.lines().nth(1).unwrap();
        assert!(first_row.starts_with('"'));
        assert!(first_row.contains("\"said \"\"more\"\"\""));
    }

    #[test]
    fn export_then_import_reproduces_events() {
        let events = sample_events();
        let report = read_events(export(&events).as_bytes()).unwrap();
        assert_eq!(report.events, events);
        assert!(report.row_errors.is_empty());
    }

    #[test]
    fn header_columns_may_be_reordered() {
        let events = sample_events();
        let metadata = serde_json::to_string(&events[1]).unwrap().replace('"', "\"\"");
        let csv = format!(
            "metadata,note,caregiverId,timestamp,type,id\n\"{metadata}\",,,,,\n"
        );
        let report = read_events(csv.as_bytes()).unwrap();
        assert_eq!(report.events, vec![events[1].clone()]);
    }

    #[test]
    fn bad_rows_are_reported_and_skipped() {
        let mut csv = export(&sample_events());
        csv.push_str("\n\"only\",\"three\",\"columns\"\n");
        csv.push_str("\"x\",\"feed\",\"\",\"\",\"\",\"{not json}\"\n");

        let report = read_events(csv.as_bytes()).unwrap();
        assert_eq!(report.events.len(), 2);
        assert_eq!(report.event_rows, vec![1, 2]);
        assert_eq!(report.row_errors.len(), 2);
        assert_eq!(report.row_errors[0].row, 3);
        assert_eq!(report.row_errors[0].message, "has 3 columns, expected 6");
        assert_eq!(report.row_errors[1].row, 4);
        assert!(report.row_errors[1].message.starts_with("invalid metadata"));
    }

    #[test]
    fn missing_header_column_fails() {
        let err = read_events("id,type,timestamp\n\"a\",\"feed\",\"\"\n".as_bytes()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid CSV format: missing column(s) caregiverId, note, metadata"
        );
    }

    #[test]
    fn empty_inputs_fail() {
        assert!(matches!(read_events("".as_bytes()), Err(TransferError::EmptyFile)));
        let header_only = "id,type,timestamp,caregiverId,note,metadata\n\n";
        assert!(matches!(
            read_events(header_only.as_bytes()),
            Err(TransferError::EmptyFile)
        ));
    }

    #[test]
    fn all_rows_invalid_fails() {
        let csv = "id,type,timestamp,caregiverId,note,metadata\na,feed,,,,{}\n";
        assert!(matches!(
            read_events(csv.as_bytes()),
            Err(TransferError::NoValidRows { errors: 1 })
        ));
    }
}
