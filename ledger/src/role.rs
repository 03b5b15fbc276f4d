//! Identity & role oracle.
//!
//! One administrator identity is fixed when the ledger is created; everyone
//! else holds the regular role. Roles only govern edit/delete rights, never
//! the self-vote rule.

use ideas_types::Address;
use serde::{Deserialize, Serialize};

use crate::LedgerError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Regular,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roles {
    administrator: Address,
}

impl Roles {
    pub fn new(administrator: Address) -> Self {
        Self { administrator }
    }

    pub fn administrator(&self) -> &Address {
        &self.administrator
    }

    pub fn role_of(&self, caller: &Address) -> Role {
        if self.is_administrator(caller) {
            Role::Administrator
        } else {
            Role::Regular
        }
    }

    pub fn is_administrator(&self, caller: &Address) -> bool {
        *caller == self.administrator
    }

    /// Whether `caller` may edit or delete a record written by `author`.
    pub fn can_change(&self, caller: &Address, author: &Address) -> bool {
        caller == author || self.is_administrator(caller)
    }

    pub fn authorize(&self, caller: &Address, author: &Address) -> Result<(), LedgerError> {
        if self.can_change(caller, author) {
            Ok(())
        } else {
            Err(LedgerError::Unauthorized {
                caller: caller.clone(),
            })
        }
    }
}
