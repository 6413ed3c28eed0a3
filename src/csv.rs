use std::borrow::Cow;
use std::io::{self, Write};

use crate::error::{ReportError, ReportResult};
use crate::types::Sample;

const HEADER: [&str; 3] = ["timestamp", "status_code", "url"];

/// Serialized sample table with its header row.
#[derive(Debug)]
pub struct EncodedTable(Vec<u8>);

impl EncodedTable {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

pub fn encode(samples: &[Sample]) -> ReportResult<EncodedTable> {
    encode_to(Vec::new(), samples).map(EncodedTable)
}

/// Writes the table in the order the samples are given, rows are terminated by CRLF.
pub fn encode_to<W: Write>(mut writer: W, samples: &[Sample]) -> ReportResult<W> {
    write_row(&mut writer, HEADER.map(Cow::Borrowed)).map_err(ReportError::Encoding)?;

    for sample in samples {
        let row = [
            Cow::Owned(sample.format_timestamp()),
            Cow::Owned(sample.status().to_string()),
            Cow::Borrowed(sample.label.as_str()),
        ];
        write_row(&mut writer, row).map_err(ReportError::Encoding)?;
    }

    writer.flush().map_err(ReportError::Encoding)?;
    Ok(writer)
}

fn write_row<W: Write>(writer: &mut W, fields: [Cow<'_, str>; 3]) -> io::Result<()> {
    for (index, field) in fields.iter().enumerate() {
        if index != 0 {
            writer.write_all(b",")?;
        }
        writer.write_all(escape(field).as_bytes())?;
    }
    writer.write_all(b"\r\n")
}

fn escape(field: &str) -> Cow<'_, str> {
    if field.contains([',', '"', '\r', '\n']) {
        Cow::Owned(format!("\"{}\"", field.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(field)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};

    use crate::types::{self, DataPoint, TIMESTAMP_FORMAT};

    use super::*;

    #[derive(Debug)]
    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::Other, "disk is on fire"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn time(hour: u32, minute: u32, second: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, hour, minute, second).unwrap()
    }

    fn lines(table: &EncodedTable) -> Vec<&str> {
        std::str::from_utf8(table.as_bytes()).unwrap().lines().collect()
    }

    // Minimal reader for tables without quoted fields.
    fn decode(table: &EncodedTable) -> Vec<(DateTime<Utc>, i64, String)> {
        lines(table).into_iter().skip(1).map(|line| {
            let fields: Vec<_> = line.split(',').collect();
            assert_eq!(fields.len(), 3, "{line}");

            let timestamp = NaiveDateTime::parse_from_str(fields[0], TIMESTAMP_FORMAT).unwrap().and_utc();
            (timestamp, fields[1].parse().unwrap(), fields[2].to_owned())
        }).collect()
    }

    #[test]
    fn empty() {
        let table = encode(&[]).unwrap();
        assert_eq!(table.as_bytes(), b"timestamp,status_code,url\r\n");
    }

    #[test]
    fn rows_in_chronological_order() {
        let samples = types::to_samples(vec![
            DataPoint {timestamp: time(0, 5, 0), value: 200.0},
            DataPoint {timestamp: time(0, 0, 0), value: 503.0},
        ], "example.com");

        let table = encode(&samples).unwrap();
        assert_eq!(lines(&table), [
            "timestamp,status_code,url",
            "2024-01-01T00:00:00,503,example.com",
            "2024-01-01T00:05:00,200,example.com",
        ]);
    }

    #[test]
    fn decoded_rows_match_samples() {
        let subsecond = time(23, 59, 59) + chrono::TimeDelta::milliseconds(750);
        let samples = types::to_samples(vec![
            DataPoint {timestamp: subsecond, value: 199.6},
            DataPoint {timestamp: time(12, 0, 0), value: 404.2},
            DataPoint {timestamp: time(6, 30, 0), value: 0.0},
        ], "example.com");

        let rows = decode(&encode(&samples).unwrap());
        assert_eq!(rows, [
            (time(6, 30, 0), 0, "example.com".to_owned()),
            (time(12, 0, 0), 404, "example.com".to_owned()),
            (time(23, 59, 59), 200, "example.com".to_owned()),
        ]);
    }

    #[test]
    fn quoting() {
        let samples = [Sample {
            timestamp: time(0, 0, 0),
            value: 200.0,
            label: r#"a,"b""#.to_owned(),
        }];

        let table = encode(&samples).unwrap();
        assert_eq!(lines(&table)[1], r#"2024-01-01T00:00:00,200,"a,""b""""#);
    }

    #[test]
    fn crlf_rows() {
        let samples = [Sample {timestamp: time(0, 0, 0), value: 200.0, label: "example.com".to_owned()}];
        let table = encode(&samples).unwrap();
        assert_eq!(table.as_bytes(), b"timestamp,status_code,url\r\n2024-01-01T00:00:00,200,example.com\r\n");
    }

    #[test]
    fn writer_failure() {
        let error = encode_to(BrokenWriter, &[]).unwrap_err();
        assert!(matches!(error, ReportError::Encoding(_)), "{error}");
    }
}
