use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Collection, WritableCollection, contact::Contact, line_item::{LineAmountType, LineItem}};
use crate::{
    error::Result,
    utils::date_format::{self, Flavor},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING-KEBAB-CASE")]
pub enum Type {
    Receive,
    ReceiveOverpayment,
    ReceivePrepayment,
    Spend,
    SpendOverpayment,
    SpendPrepayment,
    ReceiveTransfer,
    SpendTransfer,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Authorised,
    Deleted,
}

/// The bank account a transaction is posted against, referenced by code or ID.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct BankAccount {
    #[serde(rename = "AccountID", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl BankAccount {
    #[must_use]
    pub fn with_code(code: impl Into<String>) -> Self {
        Self {
            code: Some(code.into()),
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankTransaction {
    pub r#type: Type,
    pub contact: Contact,
    #[serde(default)]
    pub line_items: Vec<LineItem>,
    pub bank_account: BankAccount,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_reconciled: Option<bool>,
    /// Zone-less, e.g. `2024-03-01T00:00:00`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency_rate: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_amount_types: Option<LineAmountType>,
    #[serde(default, skip_serializing)]
    pub sub_total: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub total_tax: Option<Decimal>,
    #[serde(default, skip_serializing)]
    pub total: Option<Decimal>,
    #[serde(rename = "BankTransactionID", default, skip_serializing_if = "Option::is_none")]
    pub bank_transaction_id: Option<Uuid>,
    #[serde(rename = "PrepaymentID", default, skip_serializing)]
    pub prepayment_id: Option<Uuid>,
    #[serde(rename = "OverpaymentID", default, skip_serializing)]
    pub overpayment_id: Option<Uuid>,
    #[serde(rename = "UpdatedDateUTC", default, skip_serializing)]
    pub updated_date_utc: Option<String>,
    #[serde(default, skip_serializing)]
    pub has_attachments: Option<bool>,
}

impl BankTransaction {
    #[must_use]
    pub fn new(r#type: Type, contact: Contact, bank_account: BankAccount) -> Self {
        Self {
            r#type,
            contact,
            line_items: Vec::new(),
            bank_account,
            is_reconciled: None,
            date: None,
            reference: None,
            currency_code: None,
            currency_rate: None,
            url: None,
            status: None,
            line_amount_types: None,
            sub_total: None,
            total_tax: None,
            total: None,
            bank_transaction_id: None,
            prepayment_id: None,
            overpayment_id: None,
            updated_date_utc: None,
            has_attachments: None,
        }
    }

    #[must_use]
    pub fn with_line_item(mut self, line_item: LineItem) -> Self {
        self.line_items.push(line_item);
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }
}

/// The `BankTransactions` collection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BankTransactions {
    #[serde(default)]
    pub bank_transactions: Vec<BankTransaction>,
}

impl From<BankTransaction> for BankTransactions {
    fn from(transaction: BankTransaction) -> Self {
        Self {
            bank_transactions: vec![transaction],
        }
    }
}

impl Collection for BankTransactions {
    type Record = BankTransaction;

    const PATH: &'static str = "BankTransactions";
    const ENTITY: &'static str = "BankTransaction";

    fn records(&self) -> &[BankTransaction] {
        &self.bank_transactions
    }

    fn identifier(record: &BankTransaction) -> Option<String> {
        record.bank_transaction_id.map(|id| id.to_string())
    }

    fn normalize_timestamps(&mut self) -> Result<()> {
        for transaction in &mut self.bank_transactions {
            date_format::normalize(&mut transaction.date, Flavor::Local)?;
            date_format::normalize(&mut transaction.updated_date_utc, Flavor::Utc)?;
        }
        Ok(())
    }
}

impl WritableCollection for BankTransactions {}
