//! Access-control policies.
//!
//! Every handler names one [`Policy`] and asks it two questions: may this
//! caller touch the collection at all ([`Policy::check_collection`]), and may
//! this caller touch this particular object ([`Policy::check_object`]). The
//! set of policies is closed; adding one means adding a variant here, and the
//! compiler points at every match that has to learn about it.
//!
//! Denials are never silent. An anonymous caller that needs credentials gets
//! [`Denied::Unauthenticated`]; an identified caller without rights gets
//! [`Denied::Forbidden`].

use serde::{Deserialize, Serialize};

use crate::UserId;

/// The authenticated principal behind a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub is_staff: bool,
}

impl Identity {
    #[must_use]
    pub const fn is(&self, user_id: UserId) -> bool {
        self.user_id.as_i32() == user_id.as_i32()
    }
}

/// What a request wants to do, derived from the HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// `GET`, `HEAD`, `OPTIONS`.
    Read,
    /// `POST` to a collection.
    Create,
    /// `PUT` or `PATCH`.
    Update,
    /// `DELETE`.
    Delete,
}

impl Access {
    /// Safe methods never change state.
    #[must_use]
    pub const fn is_safe(self) -> bool {
        matches!(self, Self::Read)
    }
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Denied {
    #[error("authentication credentials were not provided")]
    Unauthenticated,
    #[error("you do not have permission to perform this action")]
    Forbidden,
}

/// The closed set of access policies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Anyone may read; only staff may write. Catalog resources.
    PublicRead,
    /// Any signed-in caller. Order placement.
    Authenticated,
    /// Staff only. User administration and order status changes.
    StaffOnly,
    /// Account records: the account itself or staff may read and update;
    /// only staff may create or delete.
    Owner,
    /// Orders through the generic path: staff unconditionally, the order's
    /// customer read-only.
    OrderOwner,
    /// Payment: the order's customer or staff.
    OrderPayer,
    /// Reviews: any signed-in caller may read or post; only the review's
    /// author or staff may change or delete it.
    CommentOwner,
}

impl Policy {
    /// Collection-level check, before any object is loaded.
    ///
    /// # Errors
    ///
    /// Returns [`Denied`] when the caller may not proceed.
    pub const fn check_collection(
        self,
        caller: Option<&Identity>,
        access: Access,
    ) -> Result<(), Denied> {
        match (self, caller) {
            (Self::PublicRead, _) if access.is_safe() => Ok(()),
            (_, None) => Err(Denied::Unauthenticated),
            (Self::PublicRead | Self::StaffOnly, Some(identity)) => staff(identity),
            (Self::Owner, Some(identity))
                if matches!(access, Access::Create | Access::Delete) =>
            {
                staff(identity)
            }
            (
                Self::Authenticated
                | Self::Owner
                | Self::OrderOwner
                | Self::OrderPayer
                | Self::CommentOwner,
                Some(_),
            ) => Ok(()),
        }
    }

    /// Object-level check against the object's owning user.
    ///
    /// `owner` is the account the object belongs to: the user itself for
    /// account records, the customer for orders, the author for reviews.
    /// Objects without an owner (catalog records) pass `None`.
    ///
    /// # Errors
    ///
    /// Returns [`Denied`] when the caller may not act on this object.
    pub const fn check_object(
        self,
        caller: Option<&Identity>,
        access: Access,
        owner: Option<UserId>,
    ) -> Result<(), Denied> {
        if let Err(denied) = self.check_collection(caller, access) {
            return Err(denied);
        }
        let Some(identity) = caller else {
            // Only public reads get this far without an identity.
            return Ok(());
        };
        if identity.is_staff {
            return Ok(());
        }

        let is_owner = match owner {
            Some(owner) => identity.is(owner),
            None => false,
        };

        match self {
            Self::PublicRead | Self::Authenticated => Ok(()),
            Self::StaffOnly => Err(Denied::Forbidden),
            Self::Owner => match access {
                Access::Read | Access::Update if is_owner => Ok(()),
                _ => Err(Denied::Forbidden),
            },
            Self::OrderOwner => match access {
                Access::Read if is_owner => Ok(()),
                _ => Err(Denied::Forbidden),
            },
            Self::OrderPayer => {
                if is_owner {
                    Ok(())
                } else {
                    Err(Denied::Forbidden)
                }
            }
            Self::CommentOwner => {
                if access.is_safe() || is_owner {
                    Ok(())
                } else {
                    Err(Denied::Forbidden)
                }
            }
        }
    }
}

const fn staff(identity: &Identity) -> Result<(), Denied> {
    if identity.is_staff {
        Ok(())
    } else {
        Err(Denied::Forbidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALICE: Identity = Identity {
        user_id: UserId::new(1),
        is_staff: false,
    };
    const BOB: Identity = Identity {
        user_id: UserId::new(2),
        is_staff: false,
    };
    const STAFF: Identity = Identity {
        user_id: UserId::new(99),
        is_staff: true,
    };
    const ALL_ACCESS: [Access; 4] = [Access::Read, Access::Create, Access::Update, Access::Delete];

    #[test]
    fn test_public_read() {
        let policy = Policy::PublicRead;
        assert_eq!(policy.check_collection(None, Access::Read), Ok(()));
        assert_eq!(policy.check_object(None, Access::Read, None), Ok(()));
        assert_eq!(
            policy.check_collection(None, Access::Update),
            Err(Denied::Unauthenticated)
        );
        assert_eq!(
            policy.check_object(Some(&ALICE), Access::Update, None),
            Err(Denied::Forbidden)
        );
        assert_eq!(policy.check_object(Some(&STAFF), Access::Update, None), Ok(()));
    }

    #[test]
    fn test_staff_only() {
        let policy = Policy::StaffOnly;
        assert_eq!(
            policy.check_collection(None, Access::Update),
            Err(Denied::Unauthenticated)
        );
        assert_eq!(
            policy.check_collection(Some(&ALICE), Access::Update),
            Err(Denied::Forbidden)
        );
        assert_eq!(policy.check_collection(Some(&STAFF), Access::Update), Ok(()));
    }

    #[test]
    fn test_owner_policy() {
        let policy = Policy::Owner;
        let alice = Some(ALICE.user_id);

        assert_eq!(policy.check_object(Some(&ALICE), Access::Read, alice), Ok(()));
        assert_eq!(policy.check_object(Some(&ALICE), Access::Update, alice), Ok(()));
        assert_eq!(
            policy.check_object(Some(&ALICE), Access::Delete, alice),
            Err(Denied::Forbidden)
        );
        assert_eq!(
            policy.check_object(Some(&BOB), Access::Read, alice),
            Err(Denied::Forbidden)
        );
        assert_eq!(
            policy.check_collection(Some(&ALICE), Access::Create),
            Err(Denied::Forbidden)
        );
        for access in ALL_ACCESS {
            assert_eq!(policy.check_object(Some(&STAFF), access, alice), Ok(()));
        }
    }

    #[test]
    fn test_order_owner_is_read_only_for_customers() {
        let policy = Policy::OrderOwner;
        let alice = Some(ALICE.user_id);

        assert_eq!(
            policy.check_collection(None, Access::Read),
            Err(Denied::Unauthenticated)
        );
        assert_eq!(policy.check_object(Some(&ALICE), Access::Read, alice), Ok(()));
        assert_eq!(
            policy.check_object(Some(&ALICE), Access::Update, alice),
            Err(Denied::Forbidden)
        );
        assert_eq!(
            policy.check_object(Some(&BOB), Access::Read, alice),
            Err(Denied::Forbidden)
        );
        for access in ALL_ACCESS {
            assert_eq!(policy.check_object(Some(&STAFF), access, alice), Ok(()));
        }
    }

    #[test]
    fn test_order_payer() {
        let policy = Policy::OrderPayer;
        let alice = Some(ALICE.user_id);

        assert_eq!(policy.check_object(Some(&ALICE), Access::Update, alice), Ok(()));
        assert_eq!(
            policy.check_object(Some(&BOB), Access::Update, alice),
            Err(Denied::Forbidden)
        );
        assert_eq!(policy.check_object(Some(&STAFF), Access::Update, alice), Ok(()));
    }

    #[test]
    fn test_comment_owner() {
        let policy = Policy::CommentOwner;
        let alice = Some(ALICE.user_id);

        assert_eq!(
            policy.check_collection(None, Access::Create),
            Err(Denied::Unauthenticated)
        );
        assert_eq!(policy.check_collection(Some(&BOB), Access::Create), Ok(()));
        assert_eq!(policy.check_object(Some(&BOB), Access::Read, alice), Ok(()));
        assert_eq!(
            policy.check_object(Some(&BOB), Access::Delete, alice),
            Err(Denied::Forbidden)
        );
        assert_eq!(policy.check_object(Some(&ALICE), Access::Delete, alice), Ok(()));
        assert_eq!(policy.check_object(Some(&STAFF), Access::Update, alice), Ok(()));
    }
}
