//! Streaming reader for the BOE header feed.
//!
//! The feed is a report export: a (possibly namespaced) document whose
//! `<row>` elements each hold positional `<value>` children. A value marked
//! `xsi:nil="true"` is null. Files run to hundreds of megabytes, so rows are
//! yielded one at a time and never collected.

use std::{
  fs::File,
  io::{BufRead, BufReader},
  path::Path,
};

use cargodesk_core::{
  coerce,
  feed::{FEED_FIELD_COUNT, FeedRow, HeaderFeedRecord},
};
use quick_xml::{
  Reader,
  events::{BytesStart, Event},
};

use crate::error::{Error, Result};

/// Iterator over the rows of one feed document.
///
/// A document-level error is yielded once, after which the iterator is
/// exhausted.
pub struct HeaderFeedReader<R> {
  reader:   Reader<R>,
  buf:      Vec<u8>,
  depth:    usize,
  finished: bool,
}

impl HeaderFeedReader<BufReader<File>> {
  pub fn open(path: &Path) -> Result<Self> {
    Ok(Self::new(BufReader::new(File::open(path)?)))
  }
}

impl<R: BufRead> HeaderFeedReader<R> {
  pub fn new(source: R) -> Self {
    Self {
      reader:   Reader::from_reader(source),
      buf:      Vec::new(),
      depth:    0,
      finished: false,
    }
  }

  fn next_row(&mut self) -> Result<Option<FeedRow>> {
    loop {
      self.buf.clear();
      let row_start = match self.reader.read_event_into(&mut self.buf)? {
        Event::Start(e) => {
          self.depth += 1;
          e.local_name().as_ref() == b"row"
        }
        Event::Empty(e) if e.local_name().as_ref() == b"row" => {
          return Ok(Some(FeedRow::Short { values: 0 }));
        }
        Event::End(_) => {
          self.depth = self.depth.saturating_sub(1);
          false
        }
        Event::Eof if self.depth > 0 => {
          return Err(Error::Xml("feed ended before its closing tags".into()));
        }
        Event::Eof => return Ok(None),
        _ => false,
      };

      if row_start {
        return self.read_row().map(Some);
      }
    }
  }

  /// Read up to and including the `</row>` matching an already-consumed
  /// `<row>`.
  fn read_row(&mut self) -> Result<FeedRow> {
    let mut values: Vec<Option<String>> = Vec::new();
    let mut cell: Option<Cell> = None;
    let mut nested = 0usize;

    loop {
      self.buf.clear();
      match self.reader.read_event_into(&mut self.buf)? {
        Event::Start(e) => {
          nested += 1;
          if nested == 1 && e.local_name().as_ref() == b"value" {
            cell = Some(Cell { nil: is_nil(&e)?, text: String::new() });
          }
        }
        Event::Empty(e) => {
          if nested == 0 && e.local_name().as_ref() == b"value" {
            values.push(None);
          }
        }
        Event::Text(t) => {
          if let Some(cell) = cell.as_mut() {
            cell.text.push_str(&t.unescape()?);
          }
        }
        Event::CData(c) => {
          if let Some(cell) = cell.as_mut() {
            cell.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
          }
        }
        Event::End(_) if nested == 0 => {
          self.depth = self.depth.saturating_sub(1);
          return Ok(row_from_values(values));
        }
        Event::End(_) => {
          if nested == 1 {
            if let Some(done) = cell.take() {
              values.push(done.into_value());
            }
          }
          nested -= 1;
        }
        Event::Eof => {
          return Err(Error::Xml("feed ended inside a <row>".into()));
        }
        _ => {}
      }
    }
  }
}

impl<R: BufRead> Iterator for HeaderFeedReader<R> {
  type Item = cargodesk_core::Result<FeedRow>;

  fn next(&mut self) -> Option<Self::Item> {
    if self.finished {
      return None;
    }
    match self.next_row() {
      Ok(Some(row)) => Some(Ok(row)),
      Ok(None) => {
        self.finished = true;
        None
      }
      Err(e) => {
        self.finished = true;
        Some(Err(e.into()))
      }
    }
  }
}

struct Cell {
  nil:  bool,
  text: String,
}

impl Cell {
  fn into_value(self) -> Option<String> {
    if self.nil { None } else { Some(self.text) }
  }
}

fn is_nil(start: &BytesStart<'_>) -> Result<bool> {
  for attr in start.attributes() {
    let attr = attr.map_err(|e| Error::Xml(e.to_string()))?;
    if attr.key.local_name().as_ref() == b"nil" && attr.value.as_ref() == b"true" {
      return Ok(true);
    }
  }
  Ok(false)
}

fn row_from_values(values: Vec<Option<String>>) -> FeedRow {
  if values.len() < FEED_FIELD_COUNT {
    FeedRow::Short { values: values.len() }
  } else {
    FeedRow::Record(Box::new(record_from_values(&values)))
  }
}

/// Map positional values onto a feed record. Values past the last known
/// column are ignored.
pub fn record_from_values(values: &[Option<String>]) -> HeaderFeedRecord {
  let raw = |i: usize| values.get(i).and_then(|v| v.as_deref());
  let text = |i: usize| coerce::opt_text(raw(i));
  let ts = |i: usize| coerce::timestamp(raw(i));

  HeaderFeedRecord {
    declaration_date:           ts(0),
    boe_approval_date:          ts(1),
    regime:                     text(2),
    boe_no:                     text(3),
    bl_number:                  text(4),
    importer_tin:               text(5),
    importer_name:              text(6),
    importer_address:           text(7),
    consignee_tin:              text(8),
    consignee_name:             text(9),
    consignee_address:          text(10),
    item_hs_code:               text(11),
    no_of_pkg:                  coerce::int(raw(12), 0),
    package_unit_cd:            text(13),
    item_description:           text(14),
    item_origin_country:        text(15),
    zone:                       text(16),
    cpc:                        text(17),
    gross_weight:               coerce::opt_float(raw(18)),
    net_weight:                 coerce::opt_float(raw(19)),
    port_of_loading:            text(20),
    vessel_carrier:             text(21),
    discharge_terminal:         text(22),
    shipping_line_name:         text(23),
    cargo_type:                 text(24),
    package_type:               text(25),
    gate_out_confirmation_date: ts(26),
    final_date_of_discharge:    ts(27),
    country_of_shipment:        text(28),
    port_of_discharge:          text(29),
  }
}

#[cfg(test)]
mod tests {
  use chrono::NaiveDate;

  use super::*;

  fn row(values: &[&str]) -> String {
    let cells: String = values
      .iter()
      .map(|v| match *v {
        "NIL" => r#"<value xsi:nil="true" />"#.to_string(),
        v => format!("<value>{v}</value>"),
      })
      .collect();
    format!("<row>{cells}</row>")
  }

  fn full_row() -> Vec<&'static str> {
    let mut values = vec![""; FEED_FIELD_COUNT];
    values[0] = "2024-01-15 10:30:00.0";
    values[1] = "2024-01-16T08:00:00";
    values[3] = "BOE-1";
    values[6] = "ACME TRADING";
    values[11] = "03038900";
    values[12] = "12.0";
    values[18] = "1500.5";
    values[19] = "NIL";
    values[27] = "garbage";
    values[29] = "AEJEA";
    values
  }

  fn document(rows: &[String]) -> String {
    format!(
      r#"<?xml version="1.0" encoding="utf-8"?>
<dataset xmlns="http://developer.cognos.com/schemas/xmldata/1/"
         xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <metadata><item name="a"/></metadata>
  <data>{}</data>
</dataset>"#,
      rows.concat()
    )
  }

  fn read(xml: &str) -> Vec<cargodesk_core::Result<FeedRow>> {
    HeaderFeedReader::new(xml.as_bytes()).collect()
  }

  #[test]
  fn maps_positional_values() {
    let rows = read(&document(&[row(&full_row())]));
    assert_eq!(rows.len(), 1);
    let Ok(FeedRow::Record(record)) = &rows[0] else {
      panic!("expected a record, got {:?}", rows[0]);
    };

    let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    assert_eq!(record.declaration_date, day.and_hms_opt(10, 30, 0));
    assert_eq!(record.boe_no.as_deref(), Some("BOE-1"));
    assert_eq!(record.regime, None);
    assert_eq!(record.importer_name.as_deref(), Some("ACME TRADING"));
    assert_eq!(record.no_of_pkg, 12);
    assert_eq!(record.gross_weight, Some(1500.5));
    assert_eq!(record.net_weight, None, "nil value");
    assert_eq!(record.final_date_of_discharge, None, "bad timestamp");
    assert_eq!(record.port_of_discharge.as_deref(), Some("AEJEA"));
  }

  #[test]
  fn short_rows_are_reported_not_loaded() {
    let short = vec!["x"; 25];
    let rows = read(&document(&[row(&full_row()), row(&short), row(&full_row())]));
    let kinds: Vec<_> = rows
      .into_iter()
      .map(|r| match r.unwrap() {
        FeedRow::Record(_) => None,
        FeedRow::Short { values } => Some(values),
      })
      .collect();
    assert_eq!(kinds, vec![None, Some(25), None]);
  }

  #[test]
  fn unprefixed_rows_are_read() {
    let xml = format!("<data>{}</data>", row(&full_row()));
    let rows = read(&xml);
    assert!(matches!(rows.as_slice(), [Ok(FeedRow::Record(_))]));
  }

  #[test]
  fn truncated_document_yields_one_error() {
    let xml = document(&[row(&full_row())]);
    let cut = xml.find("</data>").unwrap();
    let rows = read(&xml[..cut]);
    assert_eq!(rows.len(), 2);
    assert!(rows[0].is_ok());
    assert!(rows[1].is_err());
  }

  #[test]
  fn document_without_rows_is_empty() {
    assert!(read(&document(&[])).is_empty());
  }
}
