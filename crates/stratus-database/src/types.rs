//! Database and user wire types

use serde::{Deserialize, Serialize};

/// A database as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct Database {
    pub name: String,
    #[serde(default)]
    pub character_set: Option<String>,
    #[serde(default)]
    pub collate: Option<String>,
}

/// A database to be created on an instance.
#[derive(Debug, Clone, Serialize)]
pub struct DatabaseSpec {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collate: Option<String>,
}

impl DatabaseSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            character_set: None,
            collate: None,
        }
    }

    pub fn character_set(mut self, character_set: impl Into<String>) -> Self {
        self.character_set = Some(character_set.into());
        self
    }

    pub fn collate(mut self, collate: impl Into<String>) -> Self {
        self.collate = Some(collate.into());
        self
    }
}

/// Reference to a database inside a user grant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseRef {
    pub name: String,
}

/// A user as the API returns it.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseUser {
    pub name: String,
    #[serde(default)]
    pub databases: Vec<DatabaseRef>,
}

/// A user to be created on an instance. The password is write-only; the API
/// never returns it.
#[derive(Debug, Clone, Serialize)]
pub struct UserSpec {
    pub name: String,
    pub password: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<DatabaseRef>,
}

impl UserSpec {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
            databases: Vec::new(),
        }
    }

    pub fn database(mut self, name: impl Into<String>) -> Self {
        self.databases.push(DatabaseRef { name: name.into() });
        self
    }
}
