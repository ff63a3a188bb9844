use serde::{Deserialize, Serialize};

use crate::error::{Result, StoreError};

/// A profile record. The email is the unique key and never changes after
/// creation; name and address are free-form and optional.
#[derive(Serialize, Deserialize, PartialEq, Eq, Hash, Debug, Clone)]
pub struct Profile {
    pub email: String,
    pub name: Option<String>,
    pub address: Option<String>,
}

/// A partial edit: only fields that are `Some` are written, everything else
/// keeps its stored value.
#[derive(Serialize, Deserialize, PartialEq, Eq, Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub address: Option<String>,
}

impl ProfileChanges {
    pub fn apply(&self, profile: &mut Profile) {
        if let Some(name) = &self.name {
            profile.name = Some(name.clone());
        }
        if let Some(address) = &self.address {
            profile.address = Some(address.clone());
        }
    }
}

/// An email must be present and contain an `@`. Anything fancier is left to
/// the mail server that will eventually bounce it.
pub fn validate_email(email: &str) -> Result<()> {
    if email.trim().is_empty() {
        return Err(StoreError::InvalidInput("email is required".to_string()));
    }
    if !email.contains('@') {
        return Err(StoreError::InvalidInput(format!(
            "`{email}` is not an email address (missing `@`)"
        )));
    }
    Ok(())
}
