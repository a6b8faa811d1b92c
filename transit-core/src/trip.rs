//! QR-scan trip logging
//!
//! Each jeepney carries a QR code encoding `jeepney:<PLATE>`. Scanning it
//! produces a trip log for the passenger's chosen origin and destination.
//! Logs are kept on the device only.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::fare::FareTable;
use crate::validation::validate_plate_number;
use crate::{Error, Result};

/// Prefix of every jeepney QR payload
pub const QR_PREFIX: &str = "jeepney:";

/// Extract the plate number from a scanned QR payload
pub fn parse_qr_payload(payload: &str) -> Result<String> {
    let payload = payload.trim();
    let plate = payload
        .get(..QR_PREFIX.len())
        .filter(|prefix| prefix.eq_ignore_ascii_case(QR_PREFIX))
        .map(|_| &payload[QR_PREFIX.len()..])
        .ok_or_else(|| Error::InvalidQrPayload(format!("missing {} prefix", QR_PREFIX)))?;

    validate_plate_number(plate).map_err(Error::InvalidQrPayload)
}

/// One scan event on a passenger's device
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TripLog {
    pub plate_number: String,
    pub origin: String,
    pub destination: String,
    /// `None` when the fare matrix has no entry for the pair
    pub fare: Option<f64>,
    pub scanned_at: DateTime<Utc>,
}

impl TripLog {
    /// Record a scan; a fare miss still produces a log
    pub fn record(
        payload: &str,
        origin: &str,
        destination: &str,
        fares: &FareTable,
        scanned_at: DateTime<Utc>,
    ) -> Result<Self> {
        let plate_number = parse_qr_payload(payload)?;

        Ok(Self {
            plate_number,
            origin: origin.to_string(),
            destination: destination.to_string(),
            fare: fares.lookup(origin, destination),
            scanned_at,
        })
    }
}
