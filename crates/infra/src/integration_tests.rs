//! End-to-end flows: aggregates through the unit of work, store, and bus.

use std::sync::Arc;

use anyhow::Result;

use strata_community::{Community, CommunityName, Role, RoleName};
use strata_core::{CommunityId, DomainError, Entity, MemberId};
use strata_events::{EventBus, InMemoryEventBus};
use strata_passport::{
    CommunityGrants, CommunityPermissions, MemberPassport, Passport, RoleGrantResolver, RoleGrants,
    SystemPassport, SystemPermissionBag,
};

use crate::converters::DocumentBacked;
use crate::resolver::StoreRoleResolver;
use crate::store::InMemoryDocumentStore;
use crate::unit_of_work::{UnitOfWork, UnitOfWorkError};

type Bus = Arc<InMemoryEventBus>;
type Uow = UnitOfWork<InMemoryDocumentStore, Bus>;

fn community_admin() -> Arc<dyn Passport> {
    Arc::new(SystemPassport::new(SystemPermissionBag {
        community: CommunityPermissions {
            can_manage_roles_and_permissions: true,
            can_manage_community_settings: true,
            can_manage_members: true,
            ..Default::default()
        },
        ..Default::default()
    }))
}

fn harness() -> (InMemoryDocumentStore, Bus, Uow) {
    let store = InMemoryDocumentStore::new();
    let bus: Bus = Arc::new(InMemoryEventBus::new());
    let uow = UnitOfWork::new(store.clone(), Arc::clone(&bus), community_admin());
    (store, bus, uow)
}

fn seed_community(uow: &Uow) -> Result<Community> {
    let mut community = Community::get_new_instance(
        Arc::clone(uow.passport()),
        CommunityName::new("Oak Hollow")?,
        MemberId::new(),
    );
    uow.with_scoped_transaction(&mut community, |_| Ok(()))?;
    Ok(community)
}

#[test]
fn create_commits_the_document_and_publishes_created_after_commit() -> Result<()> {
    let (store, bus, uow) = harness();
    let subscription = bus.subscribe();

    let community = seed_community(&uow)?;

    let stored = store.committed(Community::COLLECTION, *community.id().as_uuid())?;
    assert!(stored.is_some());

    let published = subscription.drain();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].event_type(), "community.created");
    assert_eq!(published[0].aggregate_type(), "community");
    assert_eq!(published[0].aggregate_id(), *community.id().as_uuid());
    Ok(())
}

#[test]
fn load_mutate_save_publishes_one_updated_event() -> Result<()> {
    let (store, bus, uow) = harness();
    let community = seed_community(&uow)?;
    let subscription = bus.subscribe();

    let (renamed, _) =
        uow.with_scoped_transaction_by_id::<Community, _>(community.id(), |community| {
            community.set_name(CommunityName::new("Birch Row")?)
        })?;
    assert_eq!(renamed.name().value(), "Birch Row");

    let stored = store
        .committed(Community::COLLECTION, *community.id().as_uuid())?
        .ok_or_else(|| anyhow::anyhow!("document missing after commit"))?;
    assert_eq!(stored["name"], "Birch Row");

    let published = subscription.drain();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].event_type(), "community.updated");
    Ok(())
}

#[test]
fn one_transaction_publishes_staged_envelopes_in_order_exactly_once() -> Result<()> {
    let (_, bus, uow) = harness();
    let subscription = bus.subscribe();

    let passport = Arc::clone(uow.passport());
    uow.with_transaction::<Community, _>(move |repository| {
        let mut community = Community::get_new_instance(
            passport,
            CommunityName::new("Fern Gate")?,
            MemberId::new(),
        );
        repository.save(&mut community)?;
        community.set_name(CommunityName::new("Fern Gate East")?)?;
        repository.save(&mut community)?;
        Ok(())
    })?;

    let published = subscription.drain();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0].event_type(), "community.created");
    assert_eq!(published[1].event_type(), "community.updated");
    // Nothing is delivered twice.
    assert!(subscription.drain().is_empty());
    Ok(())
}

#[test]
fn unchanged_save_writes_and_publishes_nothing() -> Result<()> {
    let (_, bus, uow) = harness();
    let community = seed_community(&uow)?;
    let subscription = bus.subscribe();

    uow.with_scoped_transaction_by_id::<Community, ()>(community.id(), |_| Ok(()))?;

    assert!(subscription.drain().is_empty());
    Ok(())
}

#[test]
fn failed_transaction_rolls_back_and_publishes_nothing() -> Result<()> {
    let (store, bus, uow) = harness();
    let community = seed_community(&uow)?;
    let subscription = bus.subscribe();

    let outcome =
        uow.with_scoped_transaction_by_id::<Community, ()>(community.id(), |community| {
            community.set_name(CommunityName::new("Doomed Rename")?)?;
            Err(DomainError::structural("simulated downstream failure"))
        });
    assert!(matches!(
        outcome,
        Err(UnitOfWorkError::Domain(DomainError::Structural(_)))
    ));

    let stored = store
        .committed(Community::COLLECTION, *community.id().as_uuid())?
        .ok_or_else(|| anyhow::anyhow!("seed document missing"))?;
    assert_eq!(stored["name"], "Oak Hollow");
    assert!(subscription.drain().is_empty());
    Ok(())
}

#[test]
fn missing_aggregate_is_a_domain_not_found() {
    let (_, _, uow) = harness();

    let outcome = uow.with_scoped_transaction_by_id::<Community, ()>(&CommunityId::new(), |_| Ok(()));
    assert!(matches!(
        outcome,
        Err(UnitOfWorkError::Domain(DomainError::NotFound))
    ));
}

#[test]
fn soft_delete_publishes_deleted_once_and_locks_the_aggregate() -> Result<()> {
    let (store, bus, uow) = harness();
    let community = seed_community(&uow)?;
    let subscription = bus.subscribe();

    uow.with_scoped_transaction_by_id::<Community, ()>(community.id(), Community::request_delete)?;
    uow.with_scoped_transaction_by_id::<Community, ()>(community.id(), Community::request_delete)?;

    let published = subscription.drain();
    assert_eq!(published.len(), 1);
    assert_eq!(published[0].event_type(), "community.deleted");

    let stored = store
        .committed(Community::COLLECTION, *community.id().as_uuid())?
        .ok_or_else(|| anyhow::anyhow!("document missing after soft delete"))?;
    assert_eq!(stored["is_deleted"], true);

    let outcome =
        uow.with_scoped_transaction_by_id::<Community, ()>(community.id(), |community| {
            community.set_name(CommunityName::new("Too Late")?)
        });
    assert!(matches!(
        outcome,
        Err(UnitOfWorkError::Domain(DomainError::Structural(_)))
    ));
    Ok(())
}

#[test]
fn member_acts_under_grants_resolved_from_the_store() -> Result<()> {
    let (store, bus, admin_uow) = harness();
    let community = seed_community(&admin_uow)?;

    let role = admin_uow.with_transaction::<Role, _>(|repository| {
        let mut role = Role::get_new_instance(
            Arc::clone(admin_uow.passport()),
            *community.id(),
            RoleName::new("community manager")?,
            false,
        );
        role.set_grants(RoleGrants {
            community: CommunityGrants {
                can_manage_community_settings: true,
                ..Default::default()
            },
            ..Default::default()
        })?;
        repository.save(&mut role)?;
        Ok(role)
    })?;

    let resolver: Arc<dyn RoleGrantResolver> = Arc::new(StoreRoleResolver::new(store.clone()));
    let manager: Arc<dyn Passport> = Arc::new(MemberPassport::new(
        MemberId::new(),
        *community.id(),
        *role.id(),
        Arc::clone(&resolver),
    ));
    let manager_uow = UnitOfWork::new(store.clone(), Arc::clone(&bus), manager);

    let (renamed, _) =
        manager_uow.with_scoped_transaction_by_id::<Community, _>(community.id(), |community| {
            community.set_name(CommunityName::new("Managed Meadows")?)
        })?;
    assert_eq!(renamed.name().value(), "Managed Meadows");

    // Deleting the role revokes future passports; visas already handed out
    // keep their frozen snapshots, so build a fresh actor to observe it.
    admin_uow
        .with_scoped_transaction_by_id::<Role, ()>(role.id(), Role::request_delete)?;

    let revoked: Arc<dyn Passport> = Arc::new(MemberPassport::new(
        MemberId::new(),
        *community.id(),
        *role.id(),
        resolver,
    ));
    let revoked_uow = UnitOfWork::new(store.clone(), bus, revoked);
    let outcome =
        revoked_uow.with_scoped_transaction_by_id::<Community, ()>(community.id(), |community| {
            community.set_name(CommunityName::new("Denied Downs")?)
        });
    assert!(matches!(
        outcome,
        Err(UnitOfWorkError::Domain(DomainError::Permission(_)))
    ));
    Ok(())
}
