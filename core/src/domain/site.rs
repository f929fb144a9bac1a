//! Distribution site data model.
//!
//! Sites are owned by the remote store; locally held values are cache
//! entries with no independent authority. The constructors here enforce the
//! geographic and reservoir invariants so an unchecked site can never enter
//! the cache or the wire.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::user::UserId;

/// Fields a site payload must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteField {
    /// Site display name.
    Name,
    /// Street address of the site.
    Address,
    /// Geographic latitude.
    Latitude,
    /// Geographic longitude.
    Longitude,
    /// Total reservoir capacity.
    ReservoirCapacity,
    /// Assigned sector manager.
    SectorManagerId,
}

impl SiteField {
    /// Wire-facing field name, as the UI collaborator labels it.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Address => "address",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::ReservoirCapacity => "reservoirCapacity",
            Self::SectorManagerId => "sectorManagerId",
        }
    }
}

impl fmt::Display for SiteField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validation errors raised by the geo/numeric validator and constructors.
///
/// Rules are evaluated in a fixed order so the first failure is
/// deterministic; each variant names the rule that failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteValidationError {
    /// A required field was absent or blank.
    MissingField(SiteField),
    /// Latitude or longitude did not parse to a finite value in range.
    OutOfRange(SiteField),
    /// Reservoir capacity did not parse to a finite value greater than zero.
    InvalidCapacity,
    /// Current level did not parse to a finite non-negative value.
    InvalidLevel,
    /// Current level exceeded the reservoir capacity.
    LevelExceedsCapacity,
    /// Sector manager id was not a valid identifier.
    InvalidManagerId,
    /// Site id was not a valid identifier.
    InvalidId,
}

impl fmt::Display for SiteValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "{field} is required"),
            Self::OutOfRange(SiteField::Latitude) => {
                write!(f, "latitude must be a number between -90 and 90")
            }
            Self::OutOfRange(field) => {
                write!(f, "{field} must be a number between -180 and 180")
            }
            Self::InvalidCapacity => {
                write!(f, "reservoir capacity must be a number greater than zero")
            }
            Self::InvalidLevel => {
                write!(f, "current level must be a non-negative number")
            }
            Self::LevelExceedsCapacity => {
                write!(f, "current level cannot exceed the reservoir capacity")
            }
            Self::InvalidManagerId => write!(f, "sector manager id must be a valid UUID"),
            Self::InvalidId => write!(f, "site id must be a valid UUID"),
        }
    }
}

impl std::error::Error for SiteValidationError {}

/// Stable site identifier stored as a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SiteId(Uuid);

impl SiteId {
    /// Validate and construct a [`SiteId`] from borrowed input.
    pub fn new(id: impl AsRef<str>) -> Result<Self, SiteValidationError> {
        let parsed =
            Uuid::parse_str(id.as_ref().trim()).map_err(|_| SiteValidationError::InvalidId)?;
        Ok(Self(parsed))
    }

    /// Generate a new random [`SiteId`].
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<SiteId> for String {
    fn from(value: SiteId) -> Self {
        value.0.to_string()
    }
}

impl TryFrom<String> for SiteId {
    type Error = SiteValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Operational status of a site, administered remotely and never re-derived
/// locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    /// Normal operation.
    Active,
    /// Temporarily offline for planned work.
    Maintenance,
    /// Incident response in progress.
    Emergency,
}

impl fmt::Display for SiteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Maintenance => write!(f, "maintenance"),
            Self::Emergency => write!(f, "emergency"),
        }
    }
}

/// Geographic placement of a site.
///
/// ## Invariants
/// - `latitude` is finite and within `[-90, 90]`.
/// - `longitude` is finite and within `[-180, 180]`.
/// - `address` is trimmed and non-empty.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    address: String,
    latitude: f64,
    longitude: f64,
}

impl Location {
    /// Validate and construct a [`Location`].
    pub fn try_new(
        address: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Result<Self, SiteValidationError> {
        let address = address.into();
        let trimmed = address.trim();
        if trimmed.is_empty() {
            return Err(SiteValidationError::MissingField(SiteField::Address));
        }
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(SiteValidationError::OutOfRange(SiteField::Latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(SiteValidationError::OutOfRange(SiteField::Longitude));
        }
        Ok(Self {
            address: trimmed.to_owned(),
            latitude,
            longitude,
        })
    }

    /// Street address.
    #[must_use]
    pub fn address(&self) -> &str {
        self.address.as_str()
    }

    /// Latitude in degrees.
    #[must_use]
    pub const fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Longitude in degrees.
    #[must_use]
    pub const fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// Distribution site as held by the remote store.
///
/// ## Invariants
/// - `reservoir_capacity` is finite and greater than zero.
/// - `current_level` is finite and within `[0, reservoir_capacity]`.
/// - coordinates satisfy the [`Location`] invariants.
///
/// The wire form is flat camelCase JSON; [`Location`] is an internal
/// composition, bridged through `SiteDto`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "SiteDto", into = "SiteDto")]
pub struct Site {
    id: SiteId,
    name: String,
    location: Location,
    reservoir_capacity: f64,
    current_level: f64,
    status: SiteStatus,
    sector_manager_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Site {
    /// Build a [`Site`] from components, enforcing the reservoir invariants.
    #[expect(clippy::too_many_arguments, reason = "mirrors the wire record")]
    pub fn try_new(
        id: SiteId,
        name: impl Into<String>,
        location: Location,
        reservoir_capacity: f64,
        current_level: f64,
        status: SiteStatus,
        sector_manager_id: UserId,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Result<Self, SiteValidationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(SiteValidationError::MissingField(SiteField::Name));
        }
        if !reservoir_capacity.is_finite() || reservoir_capacity <= 0.0 {
            return Err(SiteValidationError::InvalidCapacity);
        }
        if !current_level.is_finite() || current_level < 0.0 {
            return Err(SiteValidationError::InvalidLevel);
        }
        if current_level > reservoir_capacity {
            return Err(SiteValidationError::LevelExceedsCapacity);
        }
        Ok(Self {
            id,
            name: trimmed.to_owned(),
            location,
            reservoir_capacity,
            current_level,
            status,
            sector_manager_id,
            created_at,
            updated_at,
        })
    }

    /// Stable site identifier.
    #[must_use]
    pub const fn id(&self) -> &SiteId {
        &self.id
    }

    /// Display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.name.as_str()
    }

    /// Geographic placement.
    #[must_use]
    pub const fn location(&self) -> &Location {
        &self.location
    }

    /// Total reservoir capacity.
    #[must_use]
    pub const fn reservoir_capacity(&self) -> f64 {
        self.reservoir_capacity
    }

    /// Current fill level.
    #[must_use]
    pub const fn current_level(&self) -> f64 {
        self.current_level
    }

    /// Operational status.
    #[must_use]
    pub const fn status(&self) -> SiteStatus {
        self.status
    }

    /// Assigned sector manager.
    #[must_use]
    pub const fn sector_manager_id(&self) -> &UserId {
        &self.sector_manager_id
    }

    /// Creation timestamp assigned by the remote store.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Last-update timestamp assigned by the remote store.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SiteDto {
    id: SiteId,
    name: String,
    address: String,
    latitude: f64,
    longitude: f64,
    reservoir_capacity: f64,
    current_level: f64,
    status: SiteStatus,
    sector_manager_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<Site> for SiteDto {
    fn from(value: Site) -> Self {
        let Site {
            id,
            name,
            location,
            reservoir_capacity,
            current_level,
            status,
            sector_manager_id,
            created_at,
            updated_at,
        } = value;
        Self {
            id,
            name,
            address: location.address,
            latitude: location.latitude,
            longitude: location.longitude,
            reservoir_capacity,
            current_level,
            status,
            sector_manager_id,
            created_at,
            updated_at,
        }
    }
}

impl TryFrom<SiteDto> for Site {
    type Error = SiteValidationError;

    fn try_from(value: SiteDto) -> Result<Self, Self::Error> {
        let SiteDto {
            id,
            name,
            address,
            latitude,
            longitude,
            reservoir_capacity,
            current_level,
            status,
            sector_manager_id,
            created_at,
            updated_at,
        } = value;
        let location = Location::try_new(address, latitude, longitude)?;
        Site::try_new(
            id,
            name,
            location,
            reservoir_capacity,
            current_level,
            status,
            sector_manager_id,
            created_at,
            updated_at,
        )
    }
}
