use crate::error::ValidationError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Stable identifier for a savings group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(Uuid);

impl GroupId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GroupId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stable identifier for a group member.
///
/// This is the only key used to join a member's rows across periods.
/// Display names and roster positions change; the id never does.
///
/// # Examples
///
/// ```
/// use chama_ledger::core::member::MemberId;
///
/// let a = MemberId::new();
/// let b = MemberId::new();
/// assert_ne!(a, b);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(Uuid);

impl MemberId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for MemberId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A member of a savings group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    id: MemberId,
    group_id: GroupId,
    name: String,
    account_number: String,
}

impl Member {
    pub fn new(group_id: GroupId, name: impl Into<String>, account_number: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(),
            group_id,
            name: name.into(),
            account_number: account_number.into(),
        }
    }

    /// Rebuild a member with a known id (e.g. loaded from storage).
    pub fn with_id(
        id: MemberId,
        group_id: GroupId,
        name: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Self {
        Self {
            id,
            group_id,
            name: name.into(),
            account_number: account_number.into(),
        }
    }

    pub fn id(&self) -> MemberId {
        self.id
    }

    pub fn group_id(&self) -> GroupId {
        self.group_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn account_number(&self) -> &str {
        &self.account_number
    }

    /// Display names may be corrected at any time without affecting carry-forward.
    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }
}

/// A savings group and its current member roster.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    id: GroupId,
    name: String,
    next_meeting_date: Option<NaiveDate>,
    members: Vec<Member>,
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: GroupId::new(),
            name: name.into(),
            next_meeting_date: None,
            members: Vec::new(),
        }
    }

    pub fn with_next_meeting(mut self, date: NaiveDate) -> Self {
        self.next_meeting_date = Some(date);
        self
    }

    pub fn id(&self) -> GroupId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn next_meeting_date(&self) -> Option<NaiveDate> {
        self.next_meeting_date
    }

    pub fn schedule_meeting(&mut self, date: NaiveDate) {
        self.next_meeting_date = Some(date);
    }

    /// Enrol a new member. Account numbers are unique within the roster.
    pub fn add_member(
        &mut self,
        name: impl Into<String>,
        account_number: impl Into<String>,
    ) -> Result<MemberId, ValidationError> {
        let member = Member::new(self.id, name, account_number);
        let id = member.id();
        self.enrol(member)?;
        Ok(id)
    }

    /// Add an existing member record to the roster.
    pub fn enrol(&mut self, member: Member) -> Result<(), ValidationError> {
        if self
            .members
            .iter()
            .any(|m| m.account_number == member.account_number)
        {
            return Err(ValidationError::DuplicateAccountNumber(
                member.account_number.clone(),
            ));
        }
        if self.members.iter().any(|m| m.id == member.id) {
            return Err(ValidationError::DuplicateMember(member.id));
        }
        self.members.push(Member {
            group_id: self.id,
            ..member
        });
        Ok(())
    }

    /// Remove a member from future periods. Past periods keep their rows.
    pub fn remove_member(&mut self, id: MemberId) -> Option<Member> {
        let pos = self.members.iter().position(|m| m.id == id)?;
        Some(self.members.remove(pos))
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    pub fn member_mut(&mut self, id: MemberId) -> Option<&mut Member> {
        self.members.iter_mut().find(|m| m.id == id)
    }

    pub fn member_by_account(&self, account_number: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.account_number == account_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_member_ids_unique() {
        let a = MemberId::new();
        let b = MemberId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_add_member_rejects_duplicate_account() {
        let mut group = Group::new("Sunrise Chama");
        group.add_member("Alice", "ACC-001").unwrap();
        let err = group.add_member("Bob", "ACC-001").unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateAccountNumber(ref a) if a == "ACC-001"));
        assert_eq!(group.members().len(), 1);
    }

    #[test]
    fn test_rename_keeps_identity() {
        let mut group = Group::new("Sunrise Chama");
        let id = group.add_member("Alice", "ACC-001").unwrap();
        group.member_mut(id).unwrap().rename("Alicia");
        assert_eq!(group.member(id).unwrap().name(), "Alicia");
        assert_eq!(group.member_by_account("ACC-001").unwrap().id(), id);
    }

    #[test]
    fn test_enrol_rebinds_group() {
        let mut group = Group::new("Sunrise Chama");
        let stray = Member::new(GroupId::new(), "Carol", "ACC-009");
        let id = stray.id();
        group.enrol(stray).unwrap();
        assert_eq!(group.member(id).unwrap().group_id(), group.id());
    }

    #[test]
    fn test_remove_member() {
        let mut group = Group::new("Sunrise Chama");
        let a = group.add_member("Alice", "ACC-001").unwrap();
        group.add_member("Bob", "ACC-002").unwrap();
        assert!(group.remove_member(a).is_some());
        assert!(group.member(a).is_none());
        assert_eq!(group.members().len(), 1);
    }
}
