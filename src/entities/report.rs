//! Financial reports.
//!
//! Reports are read-only: [`Reports`] is not a writable collection, and each
//! [`ReportKind`] is a `GET` below `Reports/`
//! carrying the parameters that kind requires, merged over the caller's
//! [`Filters`].

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::{Collection, Filters, decode};
use crate::{
    Client,
    error::Result,
    utils::date_format::{self, Flavor},
};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct ReportAttribute {
    pub id: Option<String>,
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Cell {
    pub value: Option<String>,
    pub attributes: Vec<ReportAttribute>,
}

/// A report row. Sections nest further rows.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Row {
    pub row_type: Option<String>,
    pub title: Option<String>,
    pub cells: Vec<Cell>,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
pub struct Report {
    #[serde(rename = "ReportID")]
    pub report_id: Option<String>,
    pub report_name: Option<String>,
    pub report_type: Option<String>,
    pub report_titles: Vec<String>,
    pub report_date: Option<String>,
    #[serde(rename = "UpdatedDateUTC")]
    pub updated_date_utc: Option<String>,
    pub attributes: Vec<ReportAttribute>,
    pub rows: Vec<Row>,
}

/// The `Reports` collection.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Reports {
    #[serde(default)]
    pub reports: Vec<Report>,
}

impl Collection for Reports {
    type Record = Report;

    const PATH: &'static str = "Reports";
    const ENTITY: &'static str = "Report";

    fn records(&self) -> &[Report] {
        &self.reports
    }

    fn identifier(record: &Report) -> Option<String> {
        record.report_id.clone()
    }

    fn normalize_timestamps(&mut self) -> Result<()> {
        for report in &mut self.reports {
            date_format::normalize(&mut report.updated_date_utc, Flavor::Utc)?;
        }
        Ok(())
    }
}

/// The reports that can be run, with their required arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReportKind {
    /// US organisations only.
    TenNinetyNine { report_year: i32 },
    AgedPayablesByContact { contact_id: String },
    AgedReceivablesByContact { contact_id: String },
    BalanceSheet,
    BankStatement { bank_account_id: String },
    BankSummary,
    BudgetSummary,
    ExecutiveSummary,
    ProfitAndLoss,
    TrialBalance,
    /// A published BAS (AU) or GST (NZ) return, or all of them when `None`.
    TaxReturn { report_id: Option<String> },
}

impl ReportKind {
    /// The path segment below `Reports`; `None` lists the published tax returns.
    #[must_use]
    pub fn segment(&self) -> Option<&str> {
        Some(match self {
            Self::TenNinetyNine { .. } => "TenNinetyNine",
            Self::AgedPayablesByContact { .. } => "AgedPayablesByContact",
            Self::AgedReceivablesByContact { .. } => "AgedReceivablesByContact",
            Self::BalanceSheet => "BalanceSheet",
            Self::BankStatement { .. } => "BankStatement",
            Self::BankSummary => "BankSummary",
            Self::BudgetSummary => "BudgetSummary",
            Self::ExecutiveSummary => "ExecutiveSummary",
            Self::ProfitAndLoss => "ProfitAndLoss",
            Self::TrialBalance => "TrialBalance",
            Self::TaxReturn { report_id } => return report_id.as_deref(),
        })
    }

    /// `filters` with this kind's required parameters applied on top.
    #[must_use]
    pub fn apply(&self, filters: &Filters) -> Filters {
        let filters = filters.clone();
        match self {
            Self::TenNinetyNine { report_year } => {
                filters.with_param("reportYear", report_year.to_string())
            }
            Self::AgedPayablesByContact { contact_id }
            | Self::AgedReceivablesByContact { contact_id } => {
                filters.with_param("ContactID", contact_id.as_str())
            }
            Self::BankStatement { bank_account_id } => {
                filters.with_param("bankAccountID", bank_account_id.as_str())
            }
            _ => filters,
        }
    }
}

/// Run a report.
#[instrument(skip(client, filters))]
pub async fn run(client: &Client, kind: &ReportKind, filters: &Filters) -> Result<Reports> {
    let filters = kind.apply(filters);
    let url = client.endpoint(Reports::PATH, kind.segment(), Some(&filters.query()))?;
    let bytes = client
        .execute(Method::GET, url, &filters.headers()?, None)
        .await?;
    decode(&bytes)
}
