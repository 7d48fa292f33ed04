//! In-process stores used by tests and local runs without DynamoDB.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use async_trait::async_trait;
use tokio::sync::RwLock;
use crate::database::errors::StoreError;
use crate::models::device_token::DeviceToken;
use crate::models::roles::{Role, RoleMembership};
use crate::models::ticket::Ticket;
use crate::repositories::device_repository::DeviceRepository;
use crate::repositories::role_repository::RoleRepository;
use crate::repositories::ticket_repository::TicketRepository;

#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<HashMap<String, Ticket>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, ticket: Ticket) {
        self.tickets.write().await.insert(ticket.id.clone(), ticket);
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn get_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, StoreError> {
        Ok(self.tickets.read().await.get(ticket_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryRoleRepository {
    memberships: RwLock<HashMap<String, RoleMembership>>,
}

impl InMemoryRoleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn grant(&self, user_id: &str, role: Role) {
        self.memberships
            .write()
            .await
            .entry(user_id.to_string())
            .or_insert_with(|| RoleMembership::new(user_id, std::iter::empty::<Role>()))
            .roles
            .insert(role);
    }
}

#[async_trait]
impl RoleRepository for InMemoryRoleRepository {
    async fn users_with_roles(&self, roles: &HashSet<Role>) -> Result<HashSet<String>, StoreError> {
        Ok(self
            .memberships
            .read()
            .await
            .values()
            .filter(|membership| membership.intersects(roles))
            .map(|membership| membership.user_id.clone())
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryDeviceRepository {
    devices: RwLock<Vec<DeviceToken>>,
    deletes: AtomicUsize,
}

impl InMemoryDeviceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upserts on (user id, token), mirroring the table's primary key.
    pub async fn register(&self, device: DeviceToken) {
        let mut devices = self.devices.write().await;
        match devices
            .iter_mut()
            .find(|d| d.user_id == device.user_id && d.token == device.token)
        {
            Some(existing) => {
                existing.platform = device.platform;
                existing.updated_at = device.updated_at;
            }
            None => devices.push(device),
        }
    }

    pub async fn len(&self) -> usize {
        self.devices.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.devices.read().await.is_empty()
    }

    pub async fn contains(&self, token: &str) -> bool {
        self.devices.read().await.iter().any(|d| d.token == token)
    }

    /// Number of delete calls received, including no-op ones.
    pub fn delete_calls(&self) -> usize {
        self.deletes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DeviceRepository for InMemoryDeviceRepository {
    async fn tokens_for_users(&self, user_ids: &HashSet<String>) -> Result<Vec<DeviceToken>, StoreError> {
        Ok(self
            .devices
            .read()
            .await
            .iter()
            .filter(|d| user_ids.contains(&d.user_id))
            .cloned()
            .collect())
    }

    async fn delete_by_token(&self, token: &str) -> Result<usize, StoreError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        let mut devices = self.devices.write().await;
        let before = devices.len();
        devices.retain(|d| d.token != token);
        Ok(before - devices.len())
    }
}
