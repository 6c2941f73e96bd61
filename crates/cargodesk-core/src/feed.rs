//! The high-volume BOE header feed: flat rows of positional values.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Number of positional values a complete feed row carries.
pub const FEED_FIELD_COUNT: usize = 30;

/// One complete row of the header feed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeaderFeedRecord {
  pub declaration_date:           Option<NaiveDateTime>,
  pub boe_approval_date:          Option<NaiveDateTime>,
  pub regime:                     Option<String>,
  pub boe_no:                     Option<String>,
  pub bl_number:                  Option<String>,
  pub importer_tin:               Option<String>,
  pub importer_name:              Option<String>,
  pub importer_address:           Option<String>,
  pub consignee_tin:              Option<String>,
  pub consignee_name:             Option<String>,
  pub consignee_address:          Option<String>,
  pub item_hs_code:               Option<String>,
  pub no_of_pkg:                  i64,
  pub package_unit_cd:            Option<String>,
  pub item_description:           Option<String>,
  pub item_origin_country:        Option<String>,
  pub zone:                       Option<String>,
  pub cpc:                        Option<String>,
  pub gross_weight:               Option<f64>,
  pub net_weight:                 Option<f64>,
  pub port_of_loading:            Option<String>,
  pub vessel_carrier:             Option<String>,
  pub discharge_terminal:         Option<String>,
  pub shipping_line_name:         Option<String>,
  pub cargo_type:                 Option<String>,
  pub package_type:               Option<String>,
  pub gate_out_confirmation_date: Option<NaiveDateTime>,
  pub final_date_of_discharge:    Option<NaiveDateTime>,
  pub country_of_shipment:        Option<String>,
  pub port_of_discharge:          Option<String>,
}

/// One row event from a feed reader.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedRow {
  Record(Box<HeaderFeedRecord>),
  /// A row with fewer than [`FEED_FIELD_COUNT`] values; never loaded.
  Short { values: usize },
}
