//! Request DTOs for the remote store's JSON contract.
//!
//! Responses decode straight into the domain types, whose serde bridges
//! enforce the invariants; these borrow-only structs exist for request
//! bodies, where the wire shape (flat camelCase, write-once password) does
//! not match any domain type one-to-one.

use serde::Serialize;

use crate::domain::site_draft::SitePayload;
use crate::domain::user::{NewUser, Role, UserId, UserUpdate};

/// Body of `POST /users`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewUserDto<'a> {
    /// Display name.
    pub name: &'a str,
    /// Unique email address.
    pub email: &'a str,
    /// Optional contact phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
    /// Assigned role.
    pub role: Role,
    /// Initial password, write-once.
    pub password: &'a str,
}

impl<'a> From<&'a NewUser> for NewUserDto<'a> {
    fn from(value: &'a NewUser) -> Self {
        Self {
            name: value.name().as_ref(),
            email: value.email().as_ref(),
            phone: value.phone().map(AsRef::as_ref),
            role: value.role(),
            password: value.password(),
        }
    }
}

/// Body of `PUT /users/{id}`; absent fields are left unchanged remotely.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserUpdateDto<'a> {
    /// Replacement display name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
    /// Replacement email address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<&'a str>,
    /// Replacement phone number.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<&'a str>,
    /// Replacement role.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

impl<'a> From<&'a UserUpdate> for UserUpdateDto<'a> {
    fn from(value: &'a UserUpdate) -> Self {
        Self {
            name: value.name.as_ref().map(AsRef::as_ref),
            email: value.email.as_ref().map(AsRef::as_ref),
            phone: value.phone.as_ref().map(AsRef::as_ref),
            role: value.role,
        }
    }
}

/// Body of `POST /users/{id}/reset-password`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordDto<'a> {
    /// Replacement password.
    pub new_password: &'a str,
}

/// Body of `POST /sites` and `PUT /sites/{id}`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SitePayloadDto<'a> {
    /// Site display name.
    pub name: &'a str,
    /// Street address.
    pub address: &'a str,
    /// Latitude in degrees.
    pub latitude: f64,
    /// Longitude in degrees.
    pub longitude: f64,
    /// Total reservoir capacity.
    pub reservoir_capacity: f64,
    /// Current fill level.
    pub current_level: f64,
    /// Assigned sector manager.
    pub sector_manager_id: &'a UserId,
}

impl<'a> From<&'a SitePayload> for SitePayloadDto<'a> {
    fn from(value: &'a SitePayload) -> Self {
        Self {
            name: value.name.as_str(),
            address: value.location.address(),
            latitude: value.location.latitude(),
            longitude: value.location.longitude(),
            reservoir_capacity: value.reservoir_capacity,
            current_level: value.current_level,
            sector_manager_id: &value.sector_manager_id,
        }
    }
}
