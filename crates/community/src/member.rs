use std::cell::OnceCell;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use strata_core::{
    AggregateRoot, CommunityId, DomainError, DomainResult, Entity, MemberId, RootState, UserId,
    bounded_string, enumerated_string,
};
use strata_events::{DomainEvent, EventQueue};
use strata_passport::{CommunityPermissions, MemberRefs, Passport, Visa};

bounded_string!(
    /// Display name of a member (household or individual).
    pub MemberName, min = 1, max = 200
);
bounded_string!(pub AccountFirstName, min = 1, max = 500);
bounded_string!(pub AccountLastName, min = 1, max = 500);
enumerated_string!(
    /// Account lifecycle code.
    pub AccountStatus, allowed = ["CREATED", "ACCEPTED", "REJECTED"]
);

/// Identifier of a member's login account (nested entity).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberAccountId(Uuid);

impl MemberAccountId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for MemberAccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for MemberAccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Nested entity: one login account attached to a member.
///
/// Owned exclusively by its [`Member`]; read-only from outside, mutated only
/// through the owner's `request_*` methods.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberAccount {
    id: MemberAccountId,
    first_name: AccountFirstName,
    last_name: Option<AccountLastName>,
    user_id: UserId,
    status: AccountStatus,
}

impl MemberAccount {
    pub fn first_name(&self) -> &AccountFirstName {
        &self.first_name
    }

    pub fn last_name(&self) -> Option<&AccountLastName> {
        self.last_name.as_ref()
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn status(&self) -> &AccountStatus {
        &self.status
    }
}

impl Entity for MemberAccount {
    type Id = MemberAccountId;

    fn id(&self) -> &MemberAccountId {
        &self.id
    }
}

/// Aggregate root: a community member with its login accounts.
#[derive(Debug, Clone)]
pub struct Member {
    root: RootState<MemberId>,
    community_id: CommunityId,
    member_name: MemberName,
    accounts: Vec<MemberAccount>,
    passport: Arc<dyn Passport>,
    visa: OnceCell<Visa<CommunityPermissions>>,
    events: EventQueue<MemberEvent>,
}

impl Member {
    pub fn get_new_instance(
        passport: Arc<dyn Passport>,
        community_id: CommunityId,
        member_name: MemberName,
    ) -> Self {
        let mut member = Self {
            root: RootState::new_transient(MemberId::new()),
            community_id,
            member_name,
            accounts: Vec::new(),
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        };
        member.events.push(MemberEvent::Created(MemberCreated {
            member_id: *member.root.id(),
            community_id,
            occurred_at: Utc::now(),
        }));
        member.root.finish_new();
        member
    }

    pub fn from_props(props: MemberProps, passport: Arc<dyn Passport>) -> Self {
        Self {
            root: props.root,
            community_id: props.community_id,
            member_name: props.member_name,
            accounts: props.accounts,
            passport,
            visa: OnceCell::new(),
            events: EventQueue::new(),
        }
    }

    pub fn to_props(&self) -> MemberProps {
        MemberProps {
            root: self.root.clone(),
            community_id: self.community_id,
            member_name: self.member_name.clone(),
            accounts: self.accounts.clone(),
        }
    }

    pub fn community_id(&self) -> CommunityId {
        self.community_id
    }

    pub fn member_name(&self) -> &MemberName {
        &self.member_name
    }

    /// Read-only view of the account collection. Adding/removing goes
    /// through `request_new_account` / `request_remove_account`.
    pub fn accounts(&self) -> &[MemberAccount] {
        &self.accounts
    }

    pub fn pending_events(&self) -> &[MemberEvent] {
        self.events.as_slice()
    }

    fn visa(&self) -> &Visa<CommunityPermissions> {
        self.visa.get_or_init(|| {
            let refs = MemberRefs {
                community_id: self.community_id,
                member_id: *self.root.id(),
            };
            self.passport.community().for_member(&refs)
        })
    }

    fn guard<F>(&self, field: &'static str, predicate: F) -> DomainResult<()>
    where
        F: FnOnce(&CommunityPermissions) -> bool,
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

    pub fn set_member_name(&mut self, member_name: MemberName) -> DomainResult<()> {
        self.guard("member.name", |p| {
            p.is_system_account
                || p.can_manage_members
                || (p.is_editing_own_member_account && p.can_edit_own_member_profile)
        })?;
        self.member_name = member_name;
        self.root.touch();
        Ok(())
    }

    /// Attach a new login account. Status starts as `CREATED`.
    pub fn request_new_account(
        &mut self,
        first_name: AccountFirstName,
        last_name: Option<AccountLastName>,
        user_id: UserId,
    ) -> DomainResult<MemberAccountId> {
        self.guard("member.accounts.add", |p| {
            p.is_system_account
                || p.can_manage_members
                || (p.is_editing_own_member_account && p.can_edit_own_member_accounts)
        })?;
        let account = MemberAccount {
            id: MemberAccountId::new(),
            first_name,
            last_name,
            user_id,
            status: AccountStatus::new("CREATED")?,
        };
        let id = account.id;
        self.accounts.push(account);
        self.root.touch();
        Ok(id)
    }

    pub fn request_remove_account(&mut self, account_id: MemberAccountId) -> DomainResult<()> {
        self.guard("member.accounts.remove", |p| {
            p.is_system_account
                || p.can_manage_members
                || (p.is_editing_own_member_account && p.can_edit_own_member_accounts)
        })?;
        let before = self.accounts.len();
        self.accounts.retain(|a| a.id != account_id);
        if self.accounts.len() == before {
            return Err(DomainError::not_found());
        }
        self.root.touch();
        Ok(())
    }

    /// Administrative status change on one account.
    pub fn request_set_account_status(
        &mut self,
        account_id: MemberAccountId,
        status: AccountStatus,
    ) -> DomainResult<()> {
        self.guard("member.accounts.status", |p| {
            p.is_system_account || p.can_manage_members
        })?;
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.id == account_id)
            .ok_or_else(DomainError::not_found)?;
        account.status = status;
        self.root.touch();
        Ok(())
    }

    pub fn request_delete(&mut self) -> DomainResult<()> {
        if self.root.is_deleted() {
            return Ok(());
        }
        if !self
            .visa()
            .determine_if(|p| p.is_system_account || p.can_manage_members)
        {
            return Err(DomainError::permission("member.delete"));
        }
        self.root.mark_deleted();
        self.events.push(MemberEvent::Deleted(MemberDeleted {
            member_id: *self.root.id(),
            community_id: self.community_id,
            occurred_at: Utc::now(),
        }));
        Ok(())
    }
}

impl Entity for Member {
    type Id = MemberId;

    fn id(&self) -> &MemberId {
        self.root.id()
    }
}

impl AggregateRoot for Member {
    type Event = MemberEvent;

    fn root(&self) -> &RootState<MemberId> {
        &self.root
    }

    fn on_save(&mut self, modified: bool) {
        if modified && !self.root.is_deleted() {
            self.events.push(MemberEvent::Updated(MemberUpdated {
                member_id: *self.root.id(),
                community_id: self.community_id,
                occurred_at: Utc::now(),
            }));
        }
    }

    fn drain_events(&mut self) -> Vec<MemberEvent> {
        self.events.drain()
    }
}

/// Persisted shape of a member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberProps {
    #[serde(flatten)]
    pub root: RootState<MemberId>,
    pub community_id: CommunityId,
    pub member_name: MemberName,
    pub accounts: Vec<MemberAccount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberCreated {
    pub member_id: MemberId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberUpdated {
    pub member_id: MemberId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberDeleted {
    pub member_id: MemberId,
    pub community_id: CommunityId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum MemberEvent {
    Created(MemberCreated),
    Updated(MemberUpdated),
    Deleted(MemberDeleted),
}

impl DomainEvent for MemberEvent {
    fn event_type(&self) -> &'static str {
        match self {
            MemberEvent::Created(_) => "community.member.created",
            MemberEvent::Updated(_) => "community.member.updated",
            MemberEvent::Deleted(_) => "community.member.deleted",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            MemberEvent::Created(e) => e.occurred_at,
            MemberEvent::Updated(e) => e.occurred_at,
            MemberEvent::Deleted(e) => e.occurred_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use strata_core::RoleId;
    use strata_passport::{
        CommunityGrants, MemberPassport, RoleGrants, StaticRoleResolver, SystemPassport,
        SystemPermissionBag,
    };

    use super::*;

    fn members_admin() -> Arc<dyn Passport> {
        Arc::new(SystemPassport::new(SystemPermissionBag {
            community: CommunityPermissions {
                can_manage_members: true,
                ..Default::default()
            },
            ..Default::default()
        }))
    }

    fn self_service_passport(member_id: MemberId, community_id: CommunityId) -> Arc<dyn Passport> {
        let role_id = RoleId::new();
        let grants = RoleGrants {
            community: CommunityGrants {
                can_edit_own_member_profile: true,
                can_edit_own_member_accounts: true,
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

    fn new_member(passport: Arc<dyn Passport>) -> Member {
        Member::get_new_instance(
            passport,
            CommunityId::new(),
            MemberName::new("Unit 4B").unwrap(),
        )
    }

    #[test]
    fn admin_adds_and_removes_accounts() {
        let mut member = new_member(members_admin());
        let account_id = member
            .request_new_account(
                AccountFirstName::new("Dana").unwrap(),
                Some(AccountLastName::new("Kim").unwrap()),
                UserId::new(),
            )
            .unwrap();
        assert_eq!(member.accounts().len(), 1);
        assert_eq!(member.accounts()[0].status().value(), "CREATED");

        member.request_remove_account(account_id).unwrap();
        assert!(member.accounts().is_empty());
    }

    #[test]
    fn removing_a_missing_account_is_not_found() {
        let mut member = new_member(members_admin());
        let err = member
            .request_remove_account(MemberAccountId::new())
            .unwrap_err();
        assert_eq!(err, DomainError::NotFound);
    }

    #[test]
    fn member_edits_own_record_but_not_anothers() {
        let own_props = new_member(members_admin()).to_props();
        let member_id = *own_props.root.id();
        let community_id = own_props.community_id;

        // Same grants, acting on own record: allowed.
        let mut own = Member::from_props(
            own_props.clone(),
            self_service_passport(member_id, community_id),
        );
        own.set_member_name(MemberName::new("Unit 4B (renamed)").unwrap())
            .unwrap();

        // Same grants, different actor: rejected, state unchanged.
        let mut other = Member::from_props(
            own_props,
            self_service_passport(MemberId::new(), community_id),
        );
        let err = other
            .set_member_name(MemberName::new("Nope").unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));
        assert_eq!(other.member_name().value(), "Unit 4B");
    }

    #[test]
    fn account_status_change_requires_member_management() {
        let mut member = new_member(members_admin());
        let account_id = member
            .request_new_account(AccountFirstName::new("Dana").unwrap(), None, UserId::new())
            .unwrap();

        let props = member.to_props();
        let member_id = *props.root.id();
        let community_id = props.community_id;
        let mut self_service =
            Member::from_props(props, self_service_passport(member_id, community_id));

        let err = self_service
            .request_set_account_status(account_id, AccountStatus::new("ACCEPTED").unwrap())
            .unwrap_err();
        assert!(matches!(err, DomainError::Permission(_)));

        member
            .request_set_account_status(account_id, AccountStatus::new("ACCEPTED").unwrap())
            .unwrap();
        assert_eq!(member.accounts()[0].status().value(), "ACCEPTED");
    }

    #[test]
    fn delete_then_mutate_is_structural() {
        let mut member = new_member(members_admin());
        member.request_delete().unwrap();
        member.request_delete().unwrap();

        let deleted: Vec<_> = member
            .pending_events()
            .iter()
            .filter(|e| matches!(e, MemberEvent::Deleted(_)))
            .collect();
        assert_eq!(deleted.len(), 1);

        let err = member
            .request_new_account(AccountFirstName::new("Late").unwrap(), None, UserId::new())
            .unwrap_err();
        assert!(matches!(err, DomainError::Structural(_)));
    }
}
