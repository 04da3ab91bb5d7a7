//! Lists bank transactions changed in the last week, then records a receipt.
//!
//! Requires `XERO_CLIENT_ID`, `XERO_CLIENT_SECRET` and `XERO_TENANT_ID`.

use miette::{IntoDiagnostic, Result, miette};
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};
use tracing::info;

use xero_access::{
    BankAccount, BankTransaction, BankTransactions, Client, ClientConfig, Contact, Filters,
    KeyPair, LineItem, TenantId, entities::bank_transaction::Type, utils::date_format,
};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().init();

    let key_pair = KeyPair::from_env().ok_or_else(|| miette!("XERO_CLIENT_ID is not set"))?;
    let tenant = TenantId::new(std::env::var("XERO_TENANT_ID").into_diagnostic()?);
    let scopes = vec!["accounting.transactions".to_string()];

    let client =
        Client::from_client_credentials(key_pair, &scopes, tenant, ClientConfig::from_env())
            .await?;
    let transactions = client.entities::<BankTransactions>();

    let since = OffsetDateTime::now_utc() - Duration::days(7);
    let recent = transactions
        .find_modified_since(since, &Filters::new().with_order("Date DESC"))
        .await?;
    for transaction in &recent.bank_transactions {
        info!(
            id = ?transaction.bank_transaction_id,
            date = ?transaction.date,
            total = ?transaction.total,
            "bank transaction"
        );
    }

    let receipt = BankTransaction::new(
        Type::Receive,
        Contact::named("George Costanza"),
        BankAccount::with_code("090"),
    )
    .with_date(date_format::today()?)
    .with_line_item(
        LineItem::new(
            "Importing & Exporting Services",
            Decimal::ONE,
            Decimal::new(395, 0),
        )
        .with_account_code("200"),
    );
    let created = transactions.create(&BankTransactions::from(receipt)).await?;
    info!(
        created = created.bank_transactions.len(),
        "recorded receipt"
    );

    Ok(())
}
