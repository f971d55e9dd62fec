use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use strata_core::{
    AggregateRoot, BoundedList, CommunityId, DomainError, DomainResult, Entity, MemberId,
    PropertyId, RootState, bounded_string, enumerated_string,
};
use strata_events::{DomainEvent, EventQueue};
use strata_passport::{Passport, PropertyPermissions, PropertyRefs, Visa};

bounded_string!(pub PropertyName, min = 1, max = 100);
bounded_string!(pub Amenity, min = 1, max = 100);
bounded_string!(pub RoomName, min = 1, max = 100);
enumerated_string!(
    /// Listing category.
    pub PropertyType,
    allowed = ["condo", "single-family", "townhouse", "apartment", "land"]
);

/// Amenity list: each entry validated, at most 20 entries.
pub type Amenities = BoundedList<Amenity, 20>;

/// Identifier of a bedroom-detail entity nested under a property listing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BedroomDetailId(Uuid);

impl BedroomDetailId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for BedroomDetailId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for BedroomDetailId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Nested entity: one bedroom in a listing.
///
/// Owned by its [`Property`]; added/removed only through the owner's
/// `request_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BedroomDetail {
    id: BedroomDetailId,
    room_name: RoomName,
    bed_descriptions: Vec<String>,
}

impl BedroomDetail {
    pub fn room_name(&self) -> &RoomName {
        &self.room_name
    }

    pub fn bed_descriptions(&self) -> &[String] {
        &self.bed_descriptions
    }
}

impl Entity for BedroomDetail {
    type Id = BedroomDetailId;

    fn id(&self) -> &BedroomDetailId {
        &self.id
    }
}

/// Aggregate root: a property inside a community.
///
/// The owner reference drives the `is_editing_own_property` visa flag;
/// assigning or clearing the owner is itself a managed operation.
#[derive(Debug, Clone)]
pub struct Property {
    root: RootState<PropertyId>,
    community_id: CommunityId,
    owner_id: Option<MemberId>,
    property_name: PropertyName,
    property_type: Option<PropertyType>,
    listed_for_sale: bool,
    listed_for_rent: bool,
    listed_for_lease: bool,
    amenities: Amenities,
    bedrooms: Vec<BedroomDetail>,
    passport: Arc<dyn Passport>,
    visa: OnceCell<Visa<PropertyPermissions>>,
    events: EventQueue<PropertyEvent>,
}

impl Property {
    pub fn get_new_instance(
        passport: Arc<dyn Passport>,
        community_id: CommunityId,
        property_name: PropertyName,
    ) -> Self {
        let mut property = Self {
            root: RootState::new_transient(PropertyId::new()),
            community_id,
            owner_id: None,
            property_name,
            property_type: None,
            listed_for_sale: false,
            listed_for_rent: false,
            listed_for_lease: false,
            amenities: Amenities::empty(),
            bedrooms: Vec::new(),
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        };
        property.events.push(PropertyEvent::Created(PropertyCreated {
            property_id: *property.root.id(),
            community_id,
            occurred_at: Utc::now(),
        }));
        property.root.finish_new();
        property
    }

    pub fn from_props(props: PropertyProps, passport: Arc<dyn Passport>) -> Self {
        Self {
            root: props.root,
            community_id: props.community_id,
            owner_id: props.owner_id,
            property_name: props.property_name,
            property_type: props.property_type,
            listed_for_sale: props.listed_for_sale,
            listed_for_rent: props.listed_for_rent,
            listed_for_lease: props.listed_for_lease,
            amenities: props.amenities,
            bedrooms: props.bedrooms,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        }
    }

    pub fn to_props(&self) -> PropertyProps {
        PropertyProps {
            root: self.root.clone(),
            community_id: self.community_id,
            owner_id: self.owner_id,
            property_name: self.property_name.clone(),
            property_type: self.property_type.clone(),
            listed_for_sale: self.listed_for_sale,
            listed_for_rent: self.listed_for_rent,
            listed_for_lease: self.listed_for_lease,
            amenities: self.amenities.clone(),
            bedrooms: self.bedrooms.clone(),
        }
    }

    pub fn community_id(&self) -> CommunityId {
        self.community_id
    }

    pub fn owner_id(&self) -> Option<MemberId> {
        self.owner_id
    }

    pub fn property_name(&self) -> &PropertyName {
        &self.property_name
    }

    pub fn property_type(&self) -> Option<&PropertyType> {
        self.property_type.as_ref()
    }

    pub fn listed_for_sale(&self) -> bool {
        self.listed_for_sale
    }

    pub fn listed_for_rent(&self) -> bool {
        self.listed_for_rent
    }

    pub fn listed_for_lease(&self) -> bool {
        self.listed_for_lease
    }

    pub fn amenities(&self) -> &Amenities {
        &self.amenities
    }

    /// Read-only view; add/remove through `request_new_bedroom` /
    /// `request_remove_bedroom`.
    pub fn bedrooms(&self) -> &[BedroomDetail] {
        &self.bedrooms
    }

    pub fn pending_events(&self) -> &[PropertyEvent] {
        self.events.as_slice()
    }

    // Frozen at first use: a later owner change does not alter decisions
    // already being made through this instance.
    fn visa(&self) -> &Visa<PropertyPermissions> {
        self.visa.get_or_init(|| {
            let refs = PropertyRefs {
                community_id: self.community_id,
                owner_id: self.owner_id,
            };
            self.passport.property().for_property(&refs)
        })
    }

    fn guard<F>(&self, field: &'static str, predicate: F) -> DomainResult<()>
    where
        F: FnOnce(&PropertyPermissions) -> bool,
    {
        self.root.ensure_mutable()?;
        if self.root.bypasses_visa() {
            return Ok(());
        }
        if self.visa().determine_if(predicate) {
            Ok(())
        } else {
            Err(DomainError::permission(field))
        }
    }

    fn owner_or_manager(p: &PropertyPermissions) -> bool {
        p.is_system_account
            || p.can_manage_properties
            || (p.can_edit_own_property && p.is_editing_own_property)
    }

    pub fn set_property_name(&mut self, property_name: PropertyName) -> DomainResult<()> {
        self.guard("property.name", Self::owner_or_manager)?;
        self.property_name = property_name;
        self.root.touch();
        Ok(())
    }

    pub fn set_property_type(&mut self, property_type: Option<PropertyType>) -> DomainResult<()> {
        self.guard("property.type", Self::owner_or_manager)?;
        self.property_type = property_type;
        self.root.touch();
        Ok(())
    }

    pub fn set_listed_for_sale(&mut self, listed: bool) -> DomainResult<()> {
        self.guard("property.listed_for_sale", Self::owner_or_manager)?;
        self.listed_for_sale = listed;
        self.root.touch();
        Ok(())
    }

    pub fn set_listed_for_rent(&mut self, listed: bool) -> DomainResult<()> {
        self.guard("property.listed_for_rent", Self::owner_or_manager)?;
        self.listed_for_rent = listed;
        self.root.touch();
        Ok(())
    }

    pub fn set_listed_for_lease(&mut self, listed: bool) -> DomainResult<()> {
        self.guard("property.listed_for_lease", Self::owner_or_manager)?;
        self.listed_for_lease = listed;
        self.root.touch();
        Ok(())
    }

    pub fn set_amenities(&mut self, amenities: Amenities) -> DomainResult<()> {
        self.guard("property.amenities", Self::owner_or_manager)?;
        self.amenities = amenities;
        self.root.touch();
        Ok(())
    }

    /// Assign or clear the owning member. Management-only: ownership is what
    /// the owner-relative permission flag derives from.
    pub fn set_owner(&mut self, owner_id: Option<MemberId>) -> DomainResult<()> {
        self.guard("property.owner", |p| {
            p.is_system_account || p.can_manage_properties
        })?;
        self.owner_id = owner_id;
        self.root.touch();
        Ok(())
    }

    pub fn request_new_bedroom(
        &mut self,
        room_name: RoomName,
        bed_descriptions: Vec<String>,
    ) -> DomainResult<BedroomDetailId> {
        self.guard("property.bedrooms.add", Self::owner_or_manager)?;
        let bedroom = BedroomDetail {
            id: BedroomDetailId::new(),
            room_name,
            bed_descriptions,
        };
        let id = bedroom.id;
        self.bedrooms.push(bedroom);
        self.root.touch();
        Ok(id)
    }

    pub fn request_remove_bedroom(&mut self, bedroom_id: BedroomDetailId) -> DomainResult<()> {
        self.guard("property.bedrooms.remove", Self::owner_or_manager)?;
        let before = self.bedrooms.len();
        self.bedrooms.retain(|b| b.id != bedroom_id);
        if self.bedrooms.len() == before {
            return Err(DomainError::not_found());
        }
        self.root.touch();
        Ok(())
    }

    pub fn request_delete(&mut self) -> DomainResult<()> {
        if self.root.is_deleted() {
            return Ok(());
        }
        if !self
            .visa()
            .determine_if(|p| p.is_system_account || p.can_manage_properties)
        {
            return Err(DomainError::permission("property.delete"));
        }
        self.root.mark_deleted();
        self.events.push(PropertyEvent::Deleted(PropertyDeleted {
            property_id: *self.root.id(),
            community_id: self.community_id,
            occurred_at: Utc::now(),
        }));
        Ok(())
    }
}

impl Entity for Property {
    type Id = PropertyId;

    fn id(&self) -> &PropertyId {
        self.root.id()
    }
}

impl AggregateRoot for Property {
    type Event = PropertyEvent;

    fn root(&self) -> &RootState<PropertyId> {
        &self.root
    }

    fn on_save(&mut self, modified: bool) {
        if modified && !self.root.is_deleted() {
            self.events.push(PropertyEvent::Updated(PropertyUpdated {
                property_id: *self.root.id(),
                community_id: self.community_id,
                occurred_at: Utc::now(),
            }));
        }
    }

    fn drain_events(&mut self) -> Vec<PropertyEvent> {
        self.events.drain()
    }
}

/// Persisted shape of a property.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyProps {
    #[serde(flatten)]
    pub root: RootState<PropertyId>,
    pub community_id: CommunityId,
    pub owner_id: Option<MemberId>,
    pub property_name: PropertyName,
    pub property_type: Option<PropertyType>,
    pub listed_for_sale: bool,
    pub listed_for_rent: bool,
    pub listed_for_lease: bool,
    pub amenities: Amenities,
    pub bedrooms: Vec<BedroomDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyCreated {
    pub property_id: PropertyId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyUpdated {
    pub property_id: PropertyId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyDeleted {
    pub property_id: PropertyId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyEvent {
    Created(PropertyCreated),
    Updated(PropertyUpdated),
    Deleted(PropertyDeleted),
}

impl DomainEvent for PropertyEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PropertyEvent::Created(_) => "property.created",
            PropertyEvent::Updated(_) => "property.updated",
            PropertyEvent::Deleted(_) => "property.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PropertyEvent::Created(e) => e.occurred_at,
            PropertyEvent::Updated(e) => e.occurred_at,
            PropertyEvent::Deleted(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::RoleId;
    use strata_passport::{
        MemberPassport, PropertyGrants, RoleGrants, StaticRoleResolver, SystemPassport,
        SystemPermissionBag,
    };

    use super::*;

    fn property_manager() -> Arc<dyn Passport> {
        Arc::new(SystemPassport::new(SystemPermissionBag {
            property: PropertyPermissions {
                can_manage_properties: true,
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    fn owner_passport(member_id: MemberId, community_id: CommunityId) -> Arc<dyn Passport> {
        let role_id = RoleId::new();
        let grants = RoleGrants {
            property: PropertyGrants {
                can_edit_own_property: true,
                ..Default::default()
            },
            ..Default::default()
        };
        let resolver = StaticRoleResolver::new().with_role(role_id, grants);
        Arc::new(MemberPassport::new(
            member_id,
            community_id,
            role_id,
            Arc::new(resolver),
        ))
    }

    fn managed_property() -> Property {
        Property::get_new_instance(
            property_manager(),
            CommunityId::new(),
            PropertyName::new("12 Elm Court").unwrap(),
        )
    }

    #[test]
    fn owner_edits_own_property_non_owner_cannot() {
        let mut property = managed_property();
        let owner = MemberId::new();
        property.set_owner(Some(owner)).unwrap();
        let props = property.to_props();
        let community_id = props.community_id;

        let mut as_owner =
            Property::from_props(props.clone(), owner_passport(owner, community_id));
        as_owner
            .set_listed_for_rent(true)
            .unwrap();
        assert!(as_owner.listed_for_rent());

        let mut as_other =
            Property::from_props(props, owner_passport(MemberId::new(), community_id));
        let err = as_other.set_listed_for_rent(true).unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
        assert!(!as_other.listed_for_rent());
    }

    #[test]
    fn owner_cannot_reassign_ownership() {
        let mut property = managed_property();
        let owner = MemberId::new();
        property.set_owner(Some(owner)).unwrap();

        let mut as_owner = Property::from_props(
            property.to_props(),
            owner_passport(owner, property.community_id()),
        );
        let err = as_owner.set_owner(Some(MemberId::new())).unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
        assert_eq!(as_owner.owner_id(), Some(owner));
    }

    #[test]
    fn visa_is_frozen_at_first_use() {
        let owner = MemberId::new();
        let mut property = managed_property();
        property.set_owner(Some(owner)).unwrap();

        let mut as_owner = Property::from_props(
            property.to_props(),
            owner_passport(owner, property.community_id()),
        );
        // First check computes and caches the visa with owner = `owner`.
        as_owner.set_listed_for_sale(true).unwrap();

        // Management reassigns via a separate instance; our cached visa
        // still reflects construction-time ownership.
        as_owner.owner_id = Some(MemberId::new());
        as_owner.set_listed_for_sale(false).unwrap();
    }

    #[test]
    fn bedroom_collection_is_owner_mediated() {
        let mut property = managed_property();
        let id = property
            .request_new_bedroom(
                RoomName::new("Primary").unwrap(),
                vec!["queen".to_string()],
            )
            .unwrap();
        assert_eq!(property.bedrooms().len(), 1);

        property.request_remove_bedroom(id).unwrap();
        assert!(property.bedrooms().is_empty());

        let err = property.request_remove_bedroom(id).unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn amenity_list_is_validated() {
        let amenities = Amenities::new("property.amenities", ["pool", "gym"], |a| {
            Amenity::new(a)
        })
        .unwrap();
        let mut property = managed_property();
        property.set_amenities(amenities).unwrap();
        assert_eq!(property.amenities().len(), 2);

        let too_many: Result<Amenities, _> = Amenities::new(
            "property.amenities",
            (0..21).map(|i| format!("amenity {i}")),
            |a| Amenity::new(&a),
        );
        assert!(too_many.is_err());
    }
}
