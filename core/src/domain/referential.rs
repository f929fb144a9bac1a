//! Referential validator linking sites to their sector managers.
//!
//! These checks run against the locally known user and site sets, before the
//! authorization policy and before any network call. User deletion is never
//! cascaded: a manager still referenced by sites blocks the deletion unless
//! the caller supplies a reassignment target.

use std::fmt;

use crate::domain::site::Site;
use crate::domain::user::{Role, User, UserId};

/// Referential-integrity failures between sites and users.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReferentialError {
    /// No user with the given id is known.
    UnknownManager {
        /// The unresolvable manager id.
        id: UserId,
    },
    /// The referenced user exists but does not hold the sector-manager role.
    WrongRole {
        /// The referenced user id.
        id: UserId,
        /// The role the user actually holds.
        role: Role,
    },
    /// The user still manages sites and no reassignment was supplied.
    ManagerInUse {
        /// The manager blocked from deletion.
        id: UserId,
        /// How many sites still reference the manager.
        site_count: usize,
    },
}

impl fmt::Display for ReferentialError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownManager { id } => {
                write!(f, "no user with id {id} exists to manage the site")
            }
            Self::WrongRole { id, role } => {
                write!(
                    f,
                    "user {id} holds role {role} and cannot be assigned as sector manager",
                )
            }
            Self::ManagerInUse { id, site_count } => {
                write!(
                    f,
                    "user {id} still manages {site_count} site(s); reassign them before deleting",
                )
            }
        }
    }
}

impl std::error::Error for ReferentialError {}

/// Confirm the id resolves to a known user holding the sector-manager role.
///
/// # Errors
///
/// [`ReferentialError::UnknownManager`] when no user matches the id;
/// [`ReferentialError::WrongRole`] when the user holds another role.
pub fn ensure_assignable_manager(id: &UserId, users: &[User]) -> Result<(), ReferentialError> {
    let Some(user) = users.iter().find(|user| user.id() == id) else {
        return Err(ReferentialError::UnknownManager { id: *id });
    };
    if user.role() != Role::SectorManager {
        return Err(ReferentialError::WrongRole {
            id: *id,
            role: user.role(),
        });
    }
    Ok(())
}

/// Sites whose `sectorManagerId` references the given user.
#[must_use]
pub fn managed_sites<'a>(id: &UserId, sites: &'a [Site]) -> Vec<&'a Site> {
    sites
        .iter()
        .filter(|site| site.sector_manager_id() == id)
        .collect()
}

/// Confirm the user can be deleted without orphaning any site.
///
/// A supplied `reassignment` target lifts the block: the caller commits to
/// rewiring every managed site to that target before issuing the deletion.
///
/// # Errors
///
/// [`ReferentialError::ManagerInUse`] when at least one site still references
/// the user as its sector manager and no reassignment target was supplied.
pub fn ensure_deletable_user(
    id: &UserId,
    sites: &[Site],
    reassignment: Option<&UserId>,
) -> Result<(), ReferentialError> {
    let site_count = managed_sites(id, sites).len();
    if site_count > 0 && reassignment.is_none() {
        return Err(ReferentialError::ManagerInUse {
            id: *id,
            site_count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    //! Regression coverage for this module.
    use super::*;
    use crate::domain::site::{Location, SiteId, SiteStatus};
    use crate::domain::user::{EmailAddress, UserName};
    use chrono::Utc;
    use rstest::rstest;

    fn user(role: Role) -> User {
        User::new(
            UserId::random(),
            UserName::new("Grace Hopper").expect("valid name"),
            EmailAddress::new("grace@waterworks.example").expect("valid email"),
            None,
            role,
        )
    }

    fn site(manager: UserId) -> Site {
        Site::try_new(
            SiteId::random(),
            "North Reservoir",
            Location::try_new("1 Pump Lane", 51.5, -0.12).expect("valid location"),
            1000.0,
            400.0,
            SiteStatus::Active,
            manager,
            Utc::now(),
            Utc::now(),
        )
        .expect("valid site")
    }

    #[test]
    fn unknown_manager_is_rejected() {
        let users = vec![user(Role::SectorManager)];
        let stranger = UserId::random();
        let err = ensure_assignable_manager(&stranger, &users).expect_err("must fail");
        assert_eq!(err, ReferentialError::UnknownManager { id: stranger });
    }

    #[rstest]
    #[case(Role::User)]
    #[case(Role::Admin)]
    fn wrong_role_is_rejected(#[case] role: Role) {
        let candidate = user(role);
        let id = *candidate.id();
        let err = ensure_assignable_manager(&id, &[candidate]).expect_err("must fail");
        assert_eq!(err, ReferentialError::WrongRole { id, role });
    }

    #[test]
    fn sector_manager_is_assignable() {
        let manager = user(Role::SectorManager);
        let id = *manager.id();
        ensure_assignable_manager(&id, &[manager]).expect("assignable");
    }

    #[test]
    fn deletion_blocks_while_sites_reference_the_manager() {
        let manager = user(Role::SectorManager);
        let id = *manager.id();
        let sites = vec![site(id), site(UserId::random()), site(id)];
        let err = ensure_deletable_user(&id, &sites, None).expect_err("must fail");
        assert_eq!(err, ReferentialError::ManagerInUse { id, site_count: 2 });
    }

    #[test]
    fn a_reassignment_target_lifts_the_deletion_block() {
        let manager = user(Role::SectorManager);
        let id = *manager.id();
        let replacement = UserId::random();
        let sites = vec![site(id)];
        ensure_deletable_user(&id, &sites, Some(&replacement)).expect("deletable with target");
    }

    #[test]
    fn deletion_allowed_once_nothing_references_the_manager() {
        let id = UserId::random();
        let sites = vec![site(UserId::random())];
        ensure_deletable_user(&id, &sites, None).expect("deletable");
    }
}
