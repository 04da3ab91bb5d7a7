use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Collection, WritableCollection, contact::Contact, line_item::{LineAmountType, LineItem}};
use crate::{
    error::Result,
    utils::date_format::{self, Flavor},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Type {
    #[serde(rename = "ACCPAY")]
    AccountsPayable,

    #[serde(rename = "ACCREC")]
    AccountsReceivable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Draft,
    Submitted,
    Deleted,
    Authorised,
    Paid,
    Voided,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoice {
    pub r#type: Type,
    pub contact: Contact,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub line_items: Vec<LineItem>,
    /// Zone-less, e.g. `2024-03-01T00:00:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_amount_types: Option<LineAmountType>,
    #[serde(rename = "InvoiceID", default, skip_serializing_if = "Option::is_none")]
    pub invoice_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(default, skip_serializing)]
    pub sub_total: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub total_tax: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub total: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub amount_due: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub amount_paid: Option<Decimal>,
    #[serde(rename = "UpdatedDateUTC", default, skip_serializing)]
    pub updated_date_utc: Option<String>,
}

impl Invoice {
    #[must_use]
    pub fn new(r#type: Type, contact: Contact) -> Self {
        Self {
            r#type,
            contact,
            line_items: Vec::new(),
            date: None,
            due_date: None,
            status: None,
            line_amount_types: None,
            invoice_id: None,
            invoice_number: None,
            reference: None,
            currency_code: None,
            sub_total: None,
            total_tax: None,
            total: None,
            amount_due: None,
            amount_paid: None,
            updated_date_utc: None,
        }
    }
}

/// The `Invoices` collection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Invoices {
    #[serde(default)]
    pub invoices: Vec<Invoice>,
}

impl Collection for Invoices {
    type Record = Invoice;

    const PATH: &'static str = "Invoices";
    const ENTITY: &'static str = "Invoice";

    fn records(&self) -> &[Invoice] {
        &self.invoices
    }

    /// The invoice ID, falling back to the invoice number which the API also
    /// accepts as a path key.
    fn identifier(record: &Invoice) -> Option<String> {
        record
            .invoice_id
            .map(|id| id.to_string())
            .or_else(|| record.invoice_number.clone())
    }

    fn normalize_timestamps(&mut self) -> Result<()> {
        for invoice in &mut self.invoices {
            date_format::normalize(&mut invoice.date, Flavor::Local)?;
            date_format::normalize(&mut invoice.due_date, Flavor::Local)?;
            date_format::normalize(&mut invoice.updated_date_utc, Flavor::Utc)?;
            date_format::normalize(&mut invoice.contact.updated_date_utc, Flavor::Utc)?;
        }
        Ok(())
    }
}

impl WritableCollection for Invoices {}
