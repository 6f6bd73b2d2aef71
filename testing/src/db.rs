//! Embedded database handle provider seam.
//!
//! The embedded database itself is started elsewhere; this module only
//! models what configuration assembly reads from it.

use std::fmt;
use std::sync::Arc;

/// Connection details of a running embedded database.
///
/// Each part may be absent (fast tests run without a database).
#[derive(Clone, Default, PartialEq, Eq)]
pub struct DatabaseHandle {
    connection_string: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

impl DatabaseHandle {
    pub fn with_connection_string(mut self, connection_string: impl Into<String>) -> Self {
        self.connection_string = Some(connection_string.into());
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn connection_string(&self) -> Option<&str> {
        self.connection_string.as_deref()
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn is_empty(&self) -> bool {
        self.connection_string.is_none() && self.username.is_none() && self.password.is_none()
    }
}

impl fmt::Debug for DatabaseHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseHandle")
            .field("connection_string", &self.connection_string)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Yields the handle of an embedded database instance.
pub trait DatabaseHandleProvider {
    fn instance(&self) -> &DatabaseHandle;
}

impl<T: DatabaseHandleProvider + ?Sized> DatabaseHandleProvider for &T {
    fn instance(&self) -> &DatabaseHandle {
        (**self).instance()
    }
}

impl<T: DatabaseHandleProvider + ?Sized> DatabaseHandleProvider for Box<T> {
    fn instance(&self) -> &DatabaseHandle {
        (**self).instance()
    }
}

impl<T: DatabaseHandleProvider + ?Sized> DatabaseHandleProvider for Arc<T> {
    fn instance(&self) -> &DatabaseHandle {
        (**self).instance()
    }
}

/// Provider for a database that is already running.
#[derive(Debug, Clone, Default)]
pub struct StaticDatabaseProvider {
    handle: DatabaseHandle,
}

impl StaticDatabaseProvider {
    pub fn new(handle: DatabaseHandle) -> Self {
        Self { handle }
    }
}

impl DatabaseHandleProvider for StaticDatabaseProvider {
    fn instance(&self) -> &DatabaseHandle {
        &self.handle
    }
}
