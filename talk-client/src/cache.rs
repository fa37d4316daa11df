//! Contact and group snapshots.
//!
//! Both lists are kept sorted by id without duplicates and are replaced whole
//! on every refresh. Readers get an `Arc` of the snapshot that was current when
//! they asked; a concurrent refresh never mutates it.

use std::sync::{Arc, PoisonError, RwLock};

use talk_proto::types;

use crate::{Client, InvocationError};

// ─── Entities ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Contact {
    pub id:             String,
    pub name:           String,
    pub status_message: Option<String>,
}

impl From<types::Contact> for Contact {
    fn from(c: types::Contact) -> Self {
        Self { id: c.mid, name: c.display_name, status_message: c.status_message }
    }
}

impl From<types::Profile> for Contact {
    fn from(p: types::Profile) -> Self {
        Self { id: p.mid, name: p.display_name, status_message: p.status_message }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Group {
    pub id:      String,
    pub name:    String,
    /// `None` when the server did not report a creator.
    pub creator: Option<Contact>,
    pub members: Vec<Contact>,
    pub invitee: Vec<Contact>,
}

impl From<types::Group> for Group {
    fn from(g: types::Group) -> Self {
        Self {
            id:      g.id,
            name:    g.name,
            creator: g.creator.map(Contact::from),
            members: g.members.into_iter().map(Contact::from).collect(),
            invitee: g.invitee.into_iter().map(Contact::from).collect(),
        }
    }
}

/// Either side of a conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Entity {
    Contact(Contact),
    Group(Group),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Self::Contact(c) => &c.id,
            Self::Group(g)   => &g.id,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Contact(c) => &c.name,
            Self::Group(g)   => &g.name,
        }
    }
}

// ─── EntityCache ──────────────────────────────────────────────────────────────

trait Keyed {
    fn key(&self) -> &str;
}

impl Keyed for Contact {
    fn key(&self) -> &str { &self.id }
}

impl Keyed for Group {
    fn key(&self) -> &str { &self.id }
}

/// Sort ascending by id and keep the first entry of every id.
fn normalize<T: Keyed>(mut items: Vec<T>) -> Vec<T> {
    // stable: the first occurrence of a duplicate id wins
    items.sort_by(|a, b| a.key().cmp(b.key()));
    items.dedup_by(|later, earlier| later.key() == earlier.key());
    items
}

#[derive(Default)]
pub(crate) struct EntityCache {
    contacts: RwLock<Arc<Vec<Contact>>>,
    groups:   RwLock<Arc<Vec<Group>>>,
    profile:  RwLock<Option<Contact>>,
}

impl EntityCache {
    pub(crate) fn contacts(&self) -> Arc<Vec<Contact>> {
        self.contacts.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn groups(&self) -> Arc<Vec<Group>> {
        self.groups.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn profile(&self) -> Option<Contact> {
        self.profile.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub(crate) fn replace_contacts(&self, contacts: Vec<Contact>, profile: Contact) {
        let snapshot = Arc::new(normalize(contacts));
        *self.contacts.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
        *self.profile.write().unwrap_or_else(PoisonError::into_inner) = Some(profile);
    }

    pub(crate) fn replace_groups(&self, groups: Vec<Group>) {
        let snapshot = Arc::new(normalize(groups));
        *self.groups.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }

    /// Contacts first, then groups.
    pub(crate) fn resolve(&self, id: &str) -> Option<Entity> {
        if let Some(c) = self.contacts().iter().find(|c| c.id == id) {
            return Some(Entity::Contact(c.clone()));
        }
        self.groups().iter().find(|g| g.id == id).cloned().map(Entity::Group)
    }
}

// ─── Client methods ───────────────────────────────────────────────────────────

impl Client {
    /// Re-download every contact plus the own profile and replace the snapshot.
    ///
    /// On error the previous snapshot stays in place.
    pub async fn refresh_contacts(&self) -> Result<(), InvocationError> {
        let service = self.authorized()?;
        let ids = service.get_all_contact_ids().await?;
        let mut contacts: Vec<Contact> = service
            .get_contacts(&ids)
            .await?
            .into_iter()
            .map(Contact::from)
            .collect();
        let profile = Contact::from(service.get_profile().await?);
        contacts.push(profile.clone());

        tracing::debug!("[talk] refreshed {} contacts", contacts.len());
        self.inner.cache.replace_contacts(contacts, profile);
        Ok(())
    }

    /// Re-download every joined group and replace the snapshot.
    pub async fn refresh_groups(&self) -> Result<(), InvocationError> {
        let service = self.authorized()?;
        let ids = service.get_group_ids_joined().await?;
        let groups: Vec<Group> = service
            .get_groups(&ids)
            .await?
            .into_iter()
            .map(Group::from)
            .collect();

        tracing::debug!("[talk] refreshed {} groups", groups.len());
        self.inner.cache.replace_groups(groups);
        Ok(())
    }

    /// Current contact snapshot, sorted by id. Includes the own profile.
    pub fn contacts(&self) -> Arc<Vec<Contact>> { self.inner.cache.contacts() }

    /// Current group snapshot, sorted by id.
    pub fn groups(&self) -> Arc<Vec<Group>> { self.inner.cache.groups() }

    /// The logged-in account, as captured by the last contact refresh.
    pub fn profile(&self) -> Option<Contact> { self.inner.cache.profile() }

    pub fn contact_by_id(&self, id: &str) -> Option<Contact> {
        self.inner.cache.contacts().iter().find(|c| c.id == id).cloned()
    }

    pub fn contact_by_name(&self, name: &str) -> Option<Contact> {
        self.inner.cache.contacts().iter().find(|c| c.name == name).cloned()
    }

    pub fn group_by_id(&self, id: &str) -> Option<Group> {
        self.inner.cache.groups().iter().find(|g| g.id == id).cloned()
    }

    pub fn group_by_name(&self, name: &str) -> Option<Group> {
        self.inner.cache.groups().iter().find(|g| g.name == name).cloned()
    }

    /// Look `id` up among contacts, then groups. Unknown ids give `None`.
    pub fn resolve(&self, id: &str) -> Option<Entity> { self.inner.cache.resolve(id) }
}
