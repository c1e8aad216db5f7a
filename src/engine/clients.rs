use std::fmt;
use std::str::FromStr;
use std::sync::RwLock;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::StoreError;

/// Client identifier, displayed as `CLT-<hex>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ClientId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CLT-{}", self.0.simple().to_string().to_uppercase())
    }
}

impl FromStr for ClientId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.strip_prefix("CLT-").unwrap_or(s);
        Uuid::parse_str(raw).map(Self)
    }
}

/// Identity record of a bank client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    pub last_name: String,
    pub first_name: String,
    #[serde(default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub nationality: String,
    pub created_at: DateTime<Utc>,
}

impl Client {
    /// "First Last", used in listings
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    fn matches(&self, needle: &str) -> bool {
        self.last_name.to_lowercase().contains(needle)
            || self.first_name.to_lowercase().contains(needle)
            || self.email.to_lowercase().contains(needle)
    }
}

/// Fields supplied when registering a client.
#[derive(Debug, Clone, Default)]
pub struct NewClient {
    pub last_name: String,
    pub first_name: String,
    pub birth_date: Option<NaiveDate>,
    pub address: String,
    pub phone: String,
    pub email: String,
    pub nationality: String,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct ClientUpdate {
    pub last_name: Option<String>,
    pub first_name: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub address: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub nationality: Option<String>,
}

/// Owner of client identity records.
///
/// The ledger only reads from it to decorate views. A missing client is
/// never an error for a transaction.
pub trait ClientDirectory: Send + Sync {
    fn find(&self, id: &ClientId) -> Result<Option<Client>, StoreError>;

    /// All clients in registration order
    fn all(&self) -> Result<Vec<Client>, StoreError>;

    fn register(&self, client: NewClient) -> Result<Client, StoreError>;

    fn update(&self, id: &ClientId, update: ClientUpdate) -> Result<Client, StoreError>;

    fn remove(&self, id: &ClientId) -> Result<(), StoreError>;

    /// Case-insensitive match on last name, first name or email
    fn search(&self, term: &str) -> Result<Vec<Client>, StoreError> {
        let needle = term.to_lowercase();
        Ok(self
            .all()?
            .into_iter()
            .filter(|c| c.matches(&needle))
            .collect())
    }
}

/// Client directory kept in process memory.
#[derive(Debug, Default)]
pub struct InMemoryClientDirectory {
    clients: RwLock<Vec<Client>>,
}

impl InMemoryClientDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restore a directory from previously persisted clients
    pub fn from_clients(clients: Vec<Client>) -> Self {
        Self {
            clients: RwLock::new(clients),
        }
    }
}

impl ClientDirectory for InMemoryClientDirectory {
    fn find(&self, id: &ClientId) -> Result<Option<Client>, StoreError> {
        let clients = self.clients.read().map_err(|_| StoreError::Poisoned)?;
        Ok(clients.iter().find(|c| c.id == *id).cloned())
    }

    fn all(&self) -> Result<Vec<Client>, StoreError> {
        let clients = self.clients.read().map_err(|_| StoreError::Poisoned)?;
        Ok(clients.clone())
    }

    fn register(&self, client: NewClient) -> Result<Client, StoreError> {
        let client = Client {
            id: ClientId::new(),
            last_name: client.last_name,
            first_name: client.first_name,
            birth_date: client.birth_date,
            address: client.address,
            phone: client.phone,
            email: client.email,
            nationality: client.nationality,
            created_at: Utc::now(),
        };

        let mut clients = self.clients.write().map_err(|_| StoreError::Poisoned)?;
        clients.push(client.clone());
        log::debug!("Registered client {} ({})", client.id, client.full_name());
        Ok(client)
    }

    fn update(&self, id: &ClientId, update: ClientUpdate) -> Result<Client, StoreError> {
        let mut clients = self.clients.write().map_err(|_| StoreError::Poisoned)?;
        let client = clients
            .iter_mut()
            .find(|c| c.id == *id)
            .ok_or(StoreError::ClientNotFound { client: *id })?;

        if let Some(last_name) = update.last_name {
            client.last_name = last_name;
        }
        if let Some(first_name) = update.first_name {
            client.first_name = first_name;
        }
        if let Some(birth_date) = update.birth_date {
            client.birth_date = Some(birth_date);
        }
        if let Some(address) = update.address {
            client.address = address;
        }
        if let Some(phone) = update.phone {
            client.phone = phone;
        }
        if let Some(email) = update.email {
            client.email = email;
        }
        if let Some(nationality) = update.nationality {
            client.nationality = nationality;
        }
        Ok(client.clone())
    }

    fn remove(&self, id: &ClientId) -> Result<(), StoreError> {
        let mut clients = self.clients.write().map_err(|_| StoreError::Poisoned)?;
        let before = clients.len();
        clients.retain(|c| c.id != *id);
        if clients.len() == before {
            return Err(StoreError::ClientNotFound { client: *id });
        }
        log::debug!("Removed client {id}");
        Ok(())
    }
}
