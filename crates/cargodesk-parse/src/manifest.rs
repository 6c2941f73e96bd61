//! Manifest XML → [`ParsedManifest`].
//!
//! Every field is read from a fixed element path below the document root.
//! Missing elements never fail the parse; only a document that is not
//! well-formed XML does.

use cargodesk_core::{
  coerce,
  manifest::{
    BillOfLading, CargoTypeFlags, ContainerDetail, DocumentType, ManifestHeader,
    ParsedManifest, VehicleDetail,
  },
};
use serde_json::Value;

use crate::{error::Result, xml::Element};

const DOC_REFERENCE: &str = "DocumentHeader/DocumentReference";
const EXCHANGE: &str = "DocumentHeader/DocumentExchangeDetails";
const MANIFEST_HEADER: &str = "DocumentDetails/ManifestDocDetails/ManifestHeaderDetails";
const BILLS_OF_LADING: &str =
  "DocumentDetails/ManifestDocDetails/ManifestDetails/BillOfLadingDetails/BillOfLading";

/// Parse one manifest document.
pub fn parse_manifest(xml: &[u8]) -> Result<ParsedManifest> {
  let root = Element::parse(xml)?;
  let header = parse_header(&root);
  let crn = coerce::text(header.crn.as_deref(), "");

  let mut parsed = ParsedManifest { header, ..ParsedManifest::default() };

  for node in root.find_all(BILLS_OF_LADING) {
    let Some(bl) = parse_bill_of_lading(node, &crn) else {
      tracing::debug!(crn = %crn, "skipping bill of lading without a number");
      continue;
    };

    parsed.container_list.extend(
      node
        .find_all("Containers/ContainersDetails")
        .into_iter()
        .map(|c| parse_container(c, &bl)),
    );
    parsed.vehicle_list.extend(
      node
        .find_all("Vehicles/VehicleDetails")
        .into_iter()
        .map(|v| parse_vehicle(v, &bl)),
    );
    parsed.bl_list.push(bl);
  }

  Ok(parsed)
}

// ─── Header ──────────────────────────────────────────────────────────────────

fn parse_header(root: &Element) -> ManifestHeader {
  let doc_ref = root.find(DOC_REFERENCE);
  let exchange = root.find(EXCHANGE);
  let vessel = root.find(&format!("{MANIFEST_HEADER}/VesselAircraftDetails"));
  let ports = root.find(&format!("{MANIFEST_HEADER}/PortDetails"));
  let arrival = root.find(&format!("{MANIFEST_HEADER}/ArrivalDetails"));

  let notify_parties: Vec<String> = exchange
    .map(|e| e.find_all("NotifyPartyDetails/NotifyParty"))
    .unwrap_or_default()
    .into_iter()
    .filter_map(|n| coerce::opt_text(n.text()))
    .collect();

  ManifestHeader {
    crn:                       text(doc_ref, "CommonRefNumber"),
    document_type:             text(doc_ref, "DocumentType")
      .map(|code| DocumentType::from_code(&code)),
    document_name:             text(doc_ref, "DocumentName"),
    document_number:           text(doc_ref, "DocumentNumber"),
    message_type:              text(doc_ref, "MessageType"),
    sender_id:                 text(doc_ref, "SenderID"),
    receiving_party:           text(exchange, "ReceivingPartyDetails/ReceivingParty"),
    notify_parties:            Some(notify_parties).filter(|n| !n.is_empty()),
    rotation_no:               text(vessel, "RotationNo"),
    rotation_no_creation_date: date(vessel, "RotationNoCreationDate"),
    vessel_name:               text(vessel, "VesselName"),
    voyage_no:                 text(vessel, "VoyageNo"),
    carrier_code:              text(vessel, "CarrierCode"),
    carrier_name:              text(vessel, "carrier"),
    vessel_nationality:        text(vessel, "VesselNationality"),
    coload_yn:                 text(vessel, "ColoadYn"),
    inbound_outbound:          text(ports, "InboundOutbound"),
    transport_mode:            text(ports, "TransportMode"),
    port_of_discharge:         text(ports, "PortOfDischarge"),
    port_of_loading:           text(ports, "PortOfLoading"),
    next_port_of_call:         text(ports, "NextPortOfCall"),
    final_destination:         text(ports, "FinalDestination"),
    shipping_agent_code:       text(ports, "ShippingAgentCode"),
    agent_name:                text(ports, "AgentName"),
    customs_office_code:       text(ports, "CustomsOfficeCode"),
    eta:                       date(arrival, "ETA"),
    etd:                       date(arrival, "ETD"),
    issued_date:               date(Some(root), "DocumentSummary/IssuedDateTime"),
  }
}

// ─── Bills of lading ─────────────────────────────────────────────────────────

fn parse_bill_of_lading(node: &Element, crn: &str) -> Option<BillOfLading> {
  let bl_number = coerce::opt_text(node.text_at("BLNumber"))?;
  let at = |path: &str| node.text_at(path);

  Some(BillOfLading {
    crn: crn.to_owned(),
    bl_number,
    bl_version_no: coerce::int(at("BLVersionNo"), 0),
    master_bl_number: coerce::opt_text(at("MasterBLNumber")),
    consignee_name: coerce::opt_text(at("ConsigneeName")),
    consignee_address: coerce::opt_text(at("ConsigneeAddress")),
    shipper_name: coerce::opt_text(at("ShipperName")),
    goods_description: coerce::opt_text(at("GoodsDescription")),
    gross_weight: coerce::float(at("GrossWeight"), 0.0),
    volume: coerce::float(at("Volume"), 0.0),
    no_of_packages: coerce::int(at("NoOfPackages"), 0),
    unit: coerce::opt_text(at("Unit")),
    no_of_containers: coerce::int(at("NoOfContainers"), 0),
    no_of_vehicles: coerce::int(at("NoOfVehicles"), 0),
    imdg_codes: coerce::opt_text(at("IMDGCodes")),
    bl_type: coerce::opt_text(at("BLType")),
    port_of_loading: coerce::opt_text(at("PortOfLoading")),
    port_of_discharge: coerce::opt_text(at("PortOfDischarge")),
    place_of_receipt: coerce::opt_text(at("PlaceOfReceipt")),
    place_of_delivery: coerce::opt_text(at("PlaceOfDelivery")),
    cargo_type: node.find("CargoType").map(cargo_type_flags),
    freight_amount: coerce::float(at("FreightAmount"), 0.0),
    submitted_date: coerce::date(at("SubmittedDate")),
  })
}

/// Each child of `<CargoType>` becomes a flag keyed by its tag.
fn cargo_type_flags(node: &Element) -> CargoTypeFlags {
  node
    .children
    .iter()
    .map(|flag| {
      let value = flag
        .text()
        .map(|t| Value::String(t.to_owned()))
        .unwrap_or(Value::Null);
      (flag.name.clone(), value)
    })
    .collect()
}

// ─── Children ────────────────────────────────────────────────────────────────

fn parse_container(node: &Element, bl: &BillOfLading) -> ContainerDetail {
  let at = |path: &str| node.text_at(path);
  ContainerDetail {
    bl_number:          bl.bl_number.clone(),
    bl_version_no:      bl.bl_version_no,
    container_no:       coerce::opt_text(at("ContainerNo")),
    seal_number:        coerce::opt_text(at("SealNumber")),
    container_type:     coerce::opt_text(at("ContainerType")),
    container_size:     coerce::int(at("ContainerSize"), 0),
    freight_indicator:  coerce::opt_text(at("FreightIndicator")),
    load_status:        coerce::opt_text(at("LoadStatus")),
    gross_weight:       coerce::float(at("GrossWeight"), 0.0),
    number_of_packages: coerce::int(at("NumberOfPackages"), 0),
    unit:               coerce::opt_text(at("Unit")),
    iso_code:           coerce::opt_text(at("ISOCode")),
  }
}

fn parse_vehicle(node: &Element, bl: &BillOfLading) -> VehicleDetail {
  VehicleDetail {
    bl_number:     bl.bl_number.clone(),
    bl_version_no: bl.bl_version_no,
    chassis_no:    coerce::opt_text(node.text_at("ChassisNo")),
    model:         coerce::opt_text(node.text_at("Model")),
    make:          coerce::opt_text(node.text_at("Make")),
  }
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn text(scope: Option<&Element>, path: &str) -> Option<String> {
  coerce::opt_text(scope?.text_at(path))
}

fn date(scope: Option<&Element>, path: &str) -> Option<chrono::NaiveDate> {
  coerce::date(scope?.text_at(path))
}
