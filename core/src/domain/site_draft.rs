//! Candidate site payload and the geo/numeric validator.
//!
//! [`SiteDraft`] is the untyped form payload exactly as a UI collaborator
//! submits it: every field a string, every field optional. Validation is the
//! single parsing and normalisation boundary; nothing reaches business logic
//! without first becoming a [`SitePayload`].

use serde::{Deserialize, Serialize};

use crate::domain::site::{Location, Site, SiteField, SiteValidationError};
use crate::domain::user::UserId;

/// Untyped site form payload, pre-validation.
///
/// Field names mirror the wire contract; `current_level` defaults to zero
/// when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteDraft {
    /// Site display name.
    pub name: Option<String>,
    /// Street address.
    pub address: Option<String>,
    /// Latitude, as entered.
    pub latitude: Option<String>,
    /// Longitude, as entered.
    pub longitude: Option<String>,
    /// Total reservoir capacity, as entered.
    pub reservoir_capacity: Option<String>,
    /// Current fill level, as entered; defaults to `0`.
    pub current_level: Option<String>,
    /// Assigned sector manager id.
    pub sector_manager_id: Option<String>,
}

impl SiteDraft {
    /// Run the geo/numeric validation rules in their fixed order.
    ///
    /// The first failing rule wins, so error messages are deterministic for
    /// a given payload. The function is pure and total: every rejection is a
    /// typed [`SiteValidationError`], never a panic.
    ///
    /// # Errors
    ///
    /// - [`SiteValidationError::MissingField`] when a required field is
    ///   absent or blank.
    /// - [`SiteValidationError::OutOfRange`] when a coordinate fails to parse
    ///   to a finite value inside the geographic range.
    /// - [`SiteValidationError::InvalidCapacity`],
    ///   [`SiteValidationError::InvalidLevel`],
    ///   [`SiteValidationError::LevelExceedsCapacity`] for reservoir rules.
    /// - [`SiteValidationError::InvalidManagerId`] when the manager id is not
    ///   a UUID.
    pub fn validate(&self) -> Result<SitePayload, SiteValidationError> {
        let name = required(self.name.as_deref(), SiteField::Name)?;
        let address = required(self.address.as_deref(), SiteField::Address)?;
        let latitude_raw = required(self.latitude.as_deref(), SiteField::Latitude)?;
        let longitude_raw = required(self.longitude.as_deref(), SiteField::Longitude)?;
        let capacity_raw = required(
            self.reservoir_capacity.as_deref(),
            SiteField::ReservoirCapacity,
        )?;
        let manager_raw = required(self.sector_manager_id.as_deref(), SiteField::SectorManagerId)?;

        let latitude = parse_finite(latitude_raw)
            .filter(|value| (-90.0..=90.0).contains(value))
            .ok_or(SiteValidationError::OutOfRange(SiteField::Latitude))?;
        let longitude = parse_finite(longitude_raw)
            .filter(|value| (-180.0..=180.0).contains(value))
            .ok_or(SiteValidationError::OutOfRange(SiteField::Longitude))?;
        let reservoir_capacity = parse_finite(capacity_raw)
            .filter(|value| *value > 0.0)
            .ok_or(SiteValidationError::InvalidCapacity)?;
        let current_level = match self.current_level.as_deref().map(str::trim) {
            None | Some("") => 0.0,
            Some(raw) => parse_finite(raw)
                .filter(|value| *value >= 0.0)
                .ok_or(SiteValidationError::InvalidLevel)?,
        };
        if current_level > reservoir_capacity {
            return Err(SiteValidationError::LevelExceedsCapacity);
        }

        let sector_manager_id =
            UserId::new(manager_raw).map_err(|_| SiteValidationError::InvalidManagerId)?;
        let location = Location::try_new(address, latitude, longitude)?;

        Ok(SitePayload {
            name: name.to_owned(),
            location,
            reservoir_capacity,
            current_level,
            sector_manager_id,
        })
    }
}

fn required(value: Option<&str>, field: SiteField) -> Result<&str, SiteValidationError> {
    match value.map(str::trim) {
        None | Some("") => Err(SiteValidationError::MissingField(field)),
        Some(trimmed) => Ok(trimmed),
    }
}

fn parse_finite(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Normalised site payload, the validator's only successful outcome.
///
/// Numbers are parsed, strings trimmed, and the manager id shaped; the
/// referential validator and the authorization policy operate on this type.
#[derive(Debug, Clone, PartialEq)]
pub struct SitePayload {
    /// Site display name.
    pub name: String,
    /// Validated geographic placement.
    pub location: Location,
    /// Total reservoir capacity, greater than zero.
    pub reservoir_capacity: f64,
    /// Current fill level within `[0, reservoir_capacity]`.
    pub current_level: f64,
    /// Assigned sector manager.
    pub sector_manager_id: UserId,
}

impl SitePayload {
    /// Rebuild a full payload from a cached site, swapping the manager.
    ///
    /// Used when a deleted manager's sites are reassigned: every other field
    /// is carried over unchanged from the authoritative copy.
    #[must_use]
    pub fn reassigning(site: &Site, sector_manager_id: UserId) -> Self {
        Self {
            name: site.name().to_owned(),
            location: site.location().clone(),
            reservoir_capacity: site.reservoir_capacity(),
            current_level: site.current_level(),
            sector_manager_id,
        }
    }
}
