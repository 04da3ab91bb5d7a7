use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Collection, WritableCollection};
use crate::{
    error::Result,
    utils::date_format::{self, Flavor},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Active,
    Archived,
    GdprRequest,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Contact {
    #[serde(rename = "ContactID", skip_serializing_if = "Option::is_none")]
    pub contact_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub account_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_status: Option<Status>,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tax_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_supplier: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_customer: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_currency: Option<String>,
    #[serde(rename = "UpdatedDateUTC", skip_serializing)]
    pub updated_date_utc: Option<String>,
}

impl Contact {
    /// A contact reference by name, as used inside documents.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

/// The `Contacts` collection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Contacts {
    #[serde(default)]
    pub contacts: Vec<Contact>,
}

impl Collection for Contacts {
    type Record = Contact;

    const PATH: &'static str = "Contacts";
    const ENTITY: &'static str = "Contact";

    fn records(&self) -> &[Contact] {
        &self.contacts
    }

    fn identifier(record: &Contact) -> Option<String> {
        record.contact_id.map(|id| id.to_string())
    }

    fn normalize_timestamps(&mut self) -> Result<()> {
        for contact in &mut self.contacts {
            date_format::normalize(&mut contact.updated_date_utc, Flavor::Utc)?;
        }
        Ok(())
    }
}

impl WritableCollection for Contacts {}
