//! Mapping between aggregates and their stored documents.
//!
//! Each persistable aggregate declares its collection, its wire-visible
//! aggregate type tag, and the props shape that round-trips through the
//! document store. The repository works purely through this trait.

use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

use strata_cases::{
    ServiceTicket, ServiceTicketProps, ViolationTicket, ViolationTicketProps,
};
use strata_community::{
    Community, CommunityProps, Member, MemberProps, Role, RoleProps,
};
use strata_core::AggregateRoot;
use strata_passport::Passport;
use strata_property::{Property, PropertyProps};

/// An aggregate the repository can load and save.
pub trait DocumentBacked: AggregateRoot + Sized {
    const COLLECTION: &'static str;
    const AGGREGATE_TYPE: &'static str;

    type Props: Serialize + DeserializeOwned;

    fn uuid_of(id: &Self::Id) -> Uuid;

    fn document_id(&self) -> Uuid {
        Self::uuid_of(self.id())
    }

    fn to_props(&self) -> Self::Props;

    /// Rehydrate with the acting passport; the instance is not "new", so
    /// every mutation goes through visa checks.
    fn from_props(props: Self::Props, passport: Arc<dyn Passport>) -> Self;
}

macro_rules! document_backed {
    ($aggregate:ty, $props:ty, collection = $collection:literal, tag = $tag:literal) => {
        impl DocumentBacked for $aggregate {
            const COLLECTION: &'static str = $collection;
            const AGGREGATE_TYPE: &'static str = $tag;

            type Props = $props;

            fn uuid_of(id: &Self::Id) -> Uuid {
                *id.as_uuid()
            }

            fn to_props(&self) -> $props {
                <$aggregate>::to_props(self)
            }

            fn from_props(props: $props, passport: Arc<dyn Passport>) -> Self {
                <$aggregate>::from_props(props, passport)
            }
        }
    };
}

document_backed!(Community, CommunityProps, collection = "communities", tag = "community");
document_backed!(Member, MemberProps, collection = "members", tag = "member");
document_backed!(Role, RoleProps, collection = "roles", tag = "role");
document_backed!(Property, PropertyProps, collection = "properties", tag = "property");
document_backed!(
    ServiceTicket,
    ServiceTicketProps,
    collection = "service_tickets",
    tag = "service_ticket"
);
document_backed!(
    ViolationTicket,
    ViolationTicketProps,
    collection = "violation_tickets",
    tag = "violation_ticket"
);
