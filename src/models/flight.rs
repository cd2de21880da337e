use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{IngestError, Result};

/// A decoded flight record, exactly as the client serialized it.
///
/// All fields are plain strings on the wire; `flight_date` is a calendar
/// date (`YYYY-MM-DD`) with no time component.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct FlightRecord {
    /// The operating airline's name.
    pub airline_name: String,
    /// The aircraft model.
    pub aircraft_model: String,
    /// The departure airport code.
    pub dep_code: String,
    /// The departure airport city.
    pub dep_city: String,
    /// The arrival airport code.
    pub arr_code: String,
    /// The arrival airport city.
    pub arr_city: String,
    /// The passenger's passport number.
    pub passport_no: String,
    /// The passenger's full name.
    pub passenger_name: String,
    /// The flight number.
    pub flight_no: String,
    /// The flight date, formatted `YYYY-MM-DD`.
    pub flight_date: String,
}

impl FlightRecord {
    /// Decodes the decrypted payload bytes into a typed record.
    ///
    /// The payload is the client's length-delimited binary encoding
    /// (bincode). Fails with `MalformedRecord` on bad framing, invalid
    /// UTF-8 in string fields, trailing bytes, or an unparseable date.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (record, consumed): (FlightRecord, usize) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())
                .map_err(|e| IngestError::MalformedRecord(e.to_string()))?;
        if consumed != bytes.len() {
            return Err(IngestError::MalformedRecord(format!(
                "{} trailing bytes after record",
                bytes.len() - consumed
            )));
        }
        // Malformed dates fail fast here rather than surfacing later as a
        // storage error mid-transaction.
        record.departure_timestamp()?;
        Ok(record)
    }

    /// Builds the fact-row timestamp: the flight date at fixed midnight.
    pub fn departure_timestamp(&self) -> Result<NaiveDateTime> {
        NaiveDate::parse_from_str(&self.flight_date, "%Y-%m-%d")
            .map(|date| date.and_time(NaiveTime::MIN))
            .map_err(|e| {
                IngestError::MalformedRecord(format!(
                    "Invalid flight date {:?}: {}",
                    self.flight_date, e
                ))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub fn sample_record() -> FlightRecord {
        FlightRecord {
            airline_name: "Aeroflot".to_string(),
            aircraft_model: "A320".to_string(),
            dep_code: "SVO".to_string(),
            dep_city: "Moscow".to_string(),
            arr_code: "JFK".to_string(),
            arr_city: "New York".to_string(),
            passport_no: "750123456".to_string(),
            passenger_name: "Ivan Petrov".to_string(),
            flight_no: "SU100".to_string(),
            flight_date: "2024-06-01".to_string(),
        }
    }

    #[test]
    fn decodes_its_own_encoding() {
        let record = sample_record();
        let bytes =
            bincode::serde::encode_to_vec(&record, bincode::config::standard()).unwrap();
        assert_eq!(FlightRecord::decode(&bytes).unwrap(), record);
    }

    #[test]
    fn rejects_truncated_payloads() {
        let record = sample_record();
        let bytes =
            bincode::serde::encode_to_vec(&record, bincode::config::standard()).unwrap();
        let err = FlightRecord::decode(&bytes[..bytes.len() - 5]).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord(_)));
    }

    #[test]
    fn rejects_trailing_garbage() {
        let record = sample_record();
        let mut bytes =
            bincode::serde::encode_to_vec(&record, bincode::config::standard()).unwrap();
        bytes.extend_from_slice(&[0, 1, 2]);
        let err = FlightRecord::decode(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord(_)));
    }

    #[test]
    fn rejects_invalid_utf8_in_string_fields() {
        let record = sample_record();
        let mut bytes =
            bincode::serde::encode_to_vec(&record, bincode::config::standard()).unwrap();
        // First field is "Aeroflot": a length byte, then the string bytes.
        bytes[1] = 0xFF;
        let err = FlightRecord::decode(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord(_)));
    }

    #[test]
    fn rejects_malformed_flight_dates() {
        let mut record = sample_record();
        record.flight_date = "01.06.2024".to_string();
        let bytes =
            bincode::serde::encode_to_vec(&record, bincode::config::standard()).unwrap();
        let err = FlightRecord::decode(&bytes).unwrap_err();
        assert!(matches!(err, IngestError::MalformedRecord(_)));
    }

    #[test]
    fn departure_timestamp_is_midnight() {
        let ts = sample_record().departure_timestamp().unwrap();
        assert_eq!(ts.to_string(), "2024-06-01 00:00:00");
    }
}
