//! SQL schema for the cargodesk SQLite store.
//!
//! Executed once at connection startup. Every statement is idempotent, so an
//! existing database is opened unchanged.

/// Full schema DDL.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;

-- First write wins: a (crn, boe_no) pair is never rewritten.
CREATE TABLE IF NOT EXISTS declarations (
    id          INTEGER PRIMARY KEY,
    crn         TEXT NOT NULL,
    boe_no      TEXT NOT NULL,
    boe_date    TEXT NOT NULL,   -- YYYY-MM-DD
    bl_number   TEXT,
    payload     TEXT NOT NULL,   -- source record, JSON
    ingested_at TEXT NOT NULL,
    UNIQUE (crn, boe_no)
);

CREATE TABLE IF NOT EXISTS manifest_headers (
    crn                       TEXT PRIMARY KEY,
    document_type             TEXT,
    document_name             TEXT,
    document_number           TEXT,
    message_type              TEXT,
    sender_id                 TEXT,
    receiving_party           TEXT,
    notify_parties            TEXT,   -- JSON array
    rotation_no               TEXT,
    rotation_no_creation_date TEXT,
    vessel_name               TEXT,
    voyage_no                 TEXT,
    carrier_code              TEXT,
    carrier_name              TEXT,
    vessel_nationality        TEXT,
    coload_yn                 TEXT,
    inbound_outbound          TEXT,
    transport_mode            TEXT,
    port_of_discharge         TEXT,
    port_of_loading           TEXT,
    next_port_of_call         TEXT,
    final_destination         TEXT,
    shipping_agent_code       TEXT,
    agent_name                TEXT,
    customs_office_code       TEXT,
    eta                       TEXT,
    etd                       TEXT,
    issued_date               TEXT,
    last_amended_at           TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS bills_of_lading (
    id                INTEGER PRIMARY KEY,
    crn               TEXT NOT NULL,
    bl_number         TEXT NOT NULL,
    bl_version_no     INTEGER NOT NULL,
    master_bl_number  TEXT,
    consignee_name    TEXT,
    consignee_address TEXT,
    shipper_name      TEXT,
    goods_description TEXT,
    gross_weight      REAL NOT NULL DEFAULT 0,
    volume            REAL NOT NULL DEFAULT 0,
    no_of_packages    INTEGER NOT NULL DEFAULT 0,
    unit              TEXT,
    no_of_containers  INTEGER NOT NULL DEFAULT 0,
    no_of_vehicles    INTEGER NOT NULL DEFAULT 0,
    imdg_codes        TEXT,
    bl_type           TEXT,
    port_of_loading   TEXT,
    port_of_discharge TEXT,
    place_of_receipt  TEXT,
    place_of_delivery TEXT,
    cargo_type        TEXT,   -- JSON object of flags
    freight_amount    REAL NOT NULL DEFAULT 0,
    submitted_date    TEXT,
    latest_bl         INTEGER NOT NULL DEFAULT 1,
    UNIQUE (bl_number, bl_version_no)
);

-- At most one latest version per BL number within a CRN.
CREATE UNIQUE INDEX IF NOT EXISTS bl_single_latest_idx
    ON bills_of_lading(bl_number, crn) WHERE latest_bl = 1;
CREATE INDEX IF NOT EXISTS bl_crn_idx       ON bills_of_lading(crn);
CREATE INDEX IF NOT EXISTS bl_submitted_idx ON bills_of_lading(submitted_date);

CREATE TABLE IF NOT EXISTS bl_containers (
    id                 INTEGER PRIMARY KEY,
    bl_number          TEXT NOT NULL,
    bl_version_no      INTEGER NOT NULL,
    container_no       TEXT,
    seal_number        TEXT,
    container_type     TEXT,
    container_size     INTEGER NOT NULL DEFAULT 0,
    freight_indicator  TEXT,
    load_status        TEXT,
    gross_weight       REAL NOT NULL DEFAULT 0,
    number_of_packages INTEGER NOT NULL DEFAULT 0,
    unit               TEXT,
    iso_code           TEXT
);

CREATE TABLE IF NOT EXISTS bl_vehicles (
    id            INTEGER PRIMARY KEY,
    bl_number     TEXT NOT NULL,
    bl_version_no INTEGER NOT NULL,
    chassis_no    TEXT,
    model         TEXT,
    make          TEXT
);

CREATE INDEX IF NOT EXISTS containers_bl_idx ON bl_containers(bl_number, bl_version_no);
CREATE INDEX IF NOT EXISTS vehicles_bl_idx   ON bl_vehicles(bl_number, bl_version_no);

-- Append-only; the feed carries no natural key.
CREATE TABLE IF NOT EXISTS boe_header_feed (
    id                         INTEGER PRIMARY KEY,
    declaration_date           TEXT,
    boe_approval_date          TEXT,
    regime                     TEXT,
    boe_no                     TEXT,
    bl_number                  TEXT,
    importer_tin               TEXT,
    importer_name              TEXT,
    importer_address           TEXT,
    consignee_tin              TEXT,
    consignee_name             TEXT,
    consignee_address          TEXT,
    item_hs_code               TEXT,
    no_of_pkg                  INTEGER NOT NULL DEFAULT 0,
    package_unit_cd            TEXT,
    item_description           TEXT,
    item_origin_country        TEXT,
    zone                       TEXT,
    cpc                        TEXT,
    gross_weight               REAL,
    net_weight                 REAL,
    port_of_loading            TEXT,
    vessel_carrier             TEXT,
    discharge_terminal         TEXT,
    shipping_line_name         TEXT,
    cargo_type                 TEXT,
    package_type               TEXT,
    gate_out_confirmation_date TEXT,
    final_date_of_discharge    TEXT,
    country_of_shipment        TEXT,
    port_of_discharge          TEXT,
    ingested_at                TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS port_codes (
    port_code TEXT PRIMARY KEY,
    data      TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS commodity_groups (
    hscode TEXT PRIMARY KEY,
    data   TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS vessel_records (
    id   TEXT PRIMARY KEY,
    data TEXT NOT NULL
);

-- Audit trail of attempted files. Never read by ingestion.
CREATE TABLE IF NOT EXISTS ingest_log (
    id           INTEGER PRIMARY KEY,
    kind         TEXT NOT NULL,
    file_name    TEXT NOT NULL,
    sha256       TEXT NOT NULL,
    succeeded    INTEGER NOT NULL,
    rows_written INTEGER NOT NULL,
    message      TEXT,
    recorded_at  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS declarations_date_idx ON declarations(boe_date);
CREATE INDEX IF NOT EXISTS declarations_bl_idx   ON declarations(bl_number);
CREATE INDEX IF NOT EXISTS headers_amended_idx   ON manifest_headers(last_amended_at);

PRAGMA user_version = 1;
";
