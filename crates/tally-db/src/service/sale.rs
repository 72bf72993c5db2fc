//! # Sale Transaction Processor
//!
//! Records sales as single transactions: sale row, payment rows, stock
//! decrement and (for customers) a debt either all commit or none do.
//!
//! ## Split-Payment Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Preconditions (pool reads, no transaction yet)                        │
//! │  ├── till open?            no → TillLocked                             │
//! │  ├── actor may transact?   no → Forbidden                              │
//! │  ├── every method active?  no → NotFound / Inactive                    │
//! │  └── settle(total, payments, customer?)  → Underpayment / Overpayment  │
//! │                                                                         │
//! │  BEGIN                                                                 │
//! │  ├── StockLedger::lock_and_get     ← first statement, takes the lease  │
//! │  ├── total ≈ qty × unit_price?     no → TotalMismatch                  │
//! │  ├── till still open?              no → TillLocked                     │
//! │  ├── INSERT sale, INSERT sale_payments                                 │
//! │  ├── StockLedger::decrement        no stock → InsufficientStock        │
//! │  ├── SAVEPOINT → INSERT debt       failure: WARN, savepoint rolled back │
//! │  COMMIT                                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{NaiveDate, Utc};
use serde::Serialize;
use sqlx::{Connection, SqliteConnection};
use tracing::{info, warn};

use crate::error::{DbError, DbResult};
use crate::repository::sale::SaleFilter;
use crate::repository::{debt, sale, till};
use crate::stock_ledger::StockLedger;
use crate::Database;
use tally_core::money::Money;
use tally_core::tender::{self, Settlement, TenderLine};
use tally_core::validation::{
    normalize_text, validate_amount, validate_date_range, validate_id, validate_page,
    validate_quantity,
};
use tally_core::{
    new_id, Actor, CoreError, Debt, DebtStatus, PaymentMethod, Sale, SalePayment, ValidationError,
};

// =============================================================================
// Requests and Results
// =============================================================================

/// A one-method sale.
#[derive(Debug, Clone)]
pub struct SimpleSaleRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub payment_method_id: String,
    /// Used as the total when present and non-zero.
    pub total_amount: Option<Money>,
    pub notes: Option<String>,
}

/// A sale paid with several methods, possibly on credit.
#[derive(Debug, Clone)]
pub struct SplitSaleRequest {
    pub product_id: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub total_amount: Money,
    pub payments: Vec<TenderLine>,
    pub customer_name: Option<String>,
    pub notes: Option<String>,
}

/// What a recorded sale produced.
#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub payments: Vec<SalePayment>,
    /// Present when a customer took the shortfall on credit.
    pub debt: Option<Debt>,
    pub change_due_cents: i64,
}

/// Sales history query. Cashiers only ever see their own sales.
#[derive(Debug, Clone, Default)]
pub struct SaleQuery {
    pub cashier_id: Option<String>,
    pub product_id: Option<String>,
    pub payment_method_id: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub skip: i64,
    pub limit: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SalePage {
    pub data: Vec<Sale>,
    pub count: i64,
}

/// A stored sale with its split-payment rows and any debt it left.
#[derive(Debug, Clone, Serialize)]
pub struct SaleDetail {
    pub sale: Sale,
    pub payments: Vec<SalePayment>,
    pub debt: Option<Debt>,
}

// =============================================================================
// Processor
// =============================================================================

/// Sale recording, deletion and voiding.
#[derive(Debug, Clone)]
pub struct SaleProcessor {
    db: Database,
}

impl SaleProcessor {
    pub fn new(db: Database) -> Self {
        SaleProcessor { db }
    }

    /// Records a single-method sale.
    pub async fn create_simple_sale(
        &self,
        actor: &Actor,
        request: SimpleSaleRequest,
    ) -> DbResult<SaleReceipt> {
        self.check_preconditions(actor).await?;
        validate_line(&request.product_id, request.quantity, request.unit_price)?;
        if let Some(total) = request.total_amount {
            validate_amount("total_amount", total)?;
        }
        validate_id("payment_method_id", &request.payment_method_id)?;
        let notes = normalize_text("notes", request.notes.as_deref())?;

        let method = self
            .db
            .payment_methods()
            .get_by_id(&request.payment_method_id)
            .await?;
        ensure_usable(method.as_ref(), &request.payment_method_id)?;

        let mut tx = self.db.pool().begin().await?;

        let mut product = StockLedger::lock_and_get(&mut *tx, &request.product_id).await?;

        let total = tender::resolve_sale_total(
            request.total_amount,
            request.quantity,
            product.selling_price(),
        )?;
        tender::check_line_total(total, request.quantity, request.unit_price)?;
        ensure_till_open(&mut *tx).await?;

        let sale = Sale {
            id: new_id(),
            product_id: product.id.clone(),
            quantity: request.quantity,
            unit_price_cents: request.unit_price.cents(),
            total_amount_cents: total.cents(),
            payment_method_id: request.payment_method_id,
            customer_name: None,
            notes,
            created_by_id: actor.user_id.clone(),
            sale_date: Utc::now(),
            voided: false,
            void_reason: None,
        };

        sale::insert_sale(&mut *tx, &sale).await?;
        StockLedger::decrement(&mut *tx, &mut product, sale.quantity).await?;

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            product_id = %sale.product_id,
            quantity = sale.quantity,
            total = %total,
            remaining_stock = product.current_stock,
            "Sale recorded"
        );

        Ok(SaleReceipt {
            sale,
            payments: Vec::new(),
            debt: None,
            change_due_cents: 0,
        })
    }

    /// Records a split-payment sale; a named customer may leave a balance.
    pub async fn create_split_sale(
        &self,
        actor: &Actor,
        request: SplitSaleRequest,
    ) -> DbResult<SaleReceipt> {
        self.check_preconditions(actor).await?;
        validate_line(&request.product_id, request.quantity, request.unit_price)?;
        let customer_name = normalize_text("customer_name", request.customer_name.as_deref())?;
        let notes = normalize_text("notes", request.notes.as_deref())?;

        let methods = self.db.payment_methods().list_all().await?;
        let mut lines = Vec::with_capacity(request.payments.len());
        for (index, line) in request.payments.into_iter().enumerate() {
            validate_id(&format!("payments[{}].payment_method_id", index), &line.payment_method_id)?;
            let method = methods.iter().find(|m| m.id == line.payment_method_id);
            ensure_usable(method, &line.payment_method_id)?;
            let reference_number = normalize_text(
                &format!("payments[{}].reference_number", index),
                line.reference_number.as_deref(),
            )?;
            lines.push(TenderLine {
                reference_number,
                ..line
            });
        }

        let amounts: Vec<Money> = lines.iter().map(|l| l.amount).collect();
        let settlement = tender::settle(request.total_amount, &amounts, customer_name.is_some())?;
        let primary_method_id = tender::resolve_primary_method(lines.first(), &methods)?;

        let mut tx = self.db.pool().begin().await?;

        let mut product = StockLedger::lock_and_get(&mut *tx, &request.product_id).await?;
        tender::check_line_total(request.total_amount, request.quantity, request.unit_price)?;
        ensure_till_open(&mut *tx).await?;

        let now = Utc::now();
        let sale = Sale {
            id: new_id(),
            product_id: product.id.clone(),
            quantity: request.quantity,
            unit_price_cents: request.unit_price.cents(),
            total_amount_cents: request.total_amount.cents(),
            payment_method_id: primary_method_id,
            customer_name: customer_name.clone(),
            notes,
            created_by_id: actor.user_id.clone(),
            sale_date: now,
            voided: false,
            void_reason: None,
        };
        sale::insert_sale(&mut *tx, &sale).await?;

        let mut payments = Vec::with_capacity(lines.len());
        for line in lines {
            let payment = SalePayment {
                id: new_id(),
                sale_id: sale.id.clone(),
                payment_method_id: line.payment_method_id,
                amount_cents: line.amount.cents(),
                reference_number: line.reference_number,
                created_at: now,
            };
            sale::insert_payment(&mut *tx, &payment).await?;
            payments.push(payment);
        }

        StockLedger::decrement(&mut *tx, &mut product, sale.quantity).await?;

        let debt = match customer_name {
            Some(customer) if settlement.creates_debt() => {
                record_debt(&mut *tx, &sale, &customer, &settlement, actor).await?
            }
            _ => None,
        };

        tx.commit().await?;

        info!(
            sale_id = %sale.id,
            product_id = %sale.product_id,
            payments = payments.len(),
            total = %settlement.total,
            paid = %settlement.paid,
            debt = debt.is_some(),
            "Split-payment sale recorded"
        );

        Ok(SaleReceipt {
            sale,
            payments,
            debt,
            change_due_cents: settlement.overpaid.cents(),
        })
    }

    /// Deletes a sale and puts its quantity back in stock (administrators only).
    ///
    /// A voided sale already returned its stock, so deleting it restores nothing.
    pub async fn delete_sale(&self, actor: &Actor, sale_id: &str) -> DbResult<()> {
        actor.ensure_admin()?;

        let mut tx = self.db.pool().begin().await?;

        let removed = sale::delete_returning(&mut *tx, sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        if !removed.voided {
            restore_stock(&mut *tx, &removed.product_id, removed.quantity).await?;
        }

        tx.commit().await?;

        info!(sale_id = %sale_id, product_id = %removed.product_id, quantity = removed.quantity, "Sale deleted");
        Ok(())
    }

    /// Voids a sale and returns its stock (administrators only).
    pub async fn void_sale(&self, actor: &Actor, sale_id: &str, reason: &str) -> DbResult<Sale> {
        actor.ensure_admin()?;
        let reason = normalize_text("reason", Some(reason))?.ok_or_else(|| {
            ValidationError::Required {
                field: "reason".to_string(),
            }
        })?;

        let mut tx = self.db.pool().begin().await?;

        let Some(voided) = sale::mark_voided(&mut *tx, sale_id, &reason).await? else {
            return match sale::voided_flag(&mut *tx, sale_id).await? {
                Some(true) => Err(CoreError::AlreadyVoided(sale_id.to_string()).into()),
                _ => Err(CoreError::not_found("Sale", sale_id).into()),
            };
        };

        restore_stock(&mut *tx, &voided.product_id, voided.quantity).await?;

        tx.commit().await?;

        info!(sale_id = %sale_id, reason = %reason, "Sale voided");

        self.db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))
    }

    /// Sales history, newest first.
    pub async fn list_sales(&self, actor: &Actor, query: SaleQuery) -> DbResult<SalePage> {
        validate_page(query.skip, query.limit)?;
        validate_date_range(query.start_date, query.end_date)?;

        let cashier_id = if actor.can_view_all() {
            query.cashier_id
        } else {
            Some(actor.user_id.clone())
        };

        let (data, count) = self
            .db
            .sales()
            .list(&SaleFilter {
                cashier_id,
                product_id: query.product_id,
                payment_method_id: query.payment_method_id,
                start_date: query.start_date,
                end_date: query.end_date,
                skip: query.skip,
                limit: query.limit,
            })
            .await?;

        Ok(SalePage { data, count })
    }

    /// One sale with its payments; cashiers may only open their own.
    pub async fn get_sale(&self, actor: &Actor, sale_id: &str) -> DbResult<SaleDetail> {
        validate_id("sale_id", sale_id)?;

        let sale = self
            .db
            .sales()
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Sale", sale_id))?;

        if sale.created_by_id != actor.user_id && !actor.can_view_all() {
            return Err(CoreError::forbidden("cashiers can only view their own sales").into());
        }

        let payments = self.db.sales().payments_for(sale_id).await?;
        let debt = self.db.debts().get_for_sale(sale_id).await?;

        Ok(SaleDetail { sale, payments, debt })
    }

    /// Split-payment rows of a sale.
    pub async fn sale_payments(&self, sale_id: &str) -> DbResult<Vec<SalePayment>> {
        if self.db.sales().get_by_id(sale_id).await?.is_none() {
            return Err(CoreError::not_found("Sale", sale_id).into());
        }
        self.db.sales().payments_for(sale_id).await
    }

    /// Active payment methods, by name.
    pub async fn list_payment_methods(&self) -> DbResult<Vec<PaymentMethod>> {
        self.db.payment_methods().list_active().await
    }

    async fn check_preconditions(&self, actor: &Actor) -> DbResult<()> {
        if self.db.till_shifts().current_open().await?.is_none() {
            return Err(CoreError::TillLocked.into());
        }
        actor.ensure_can_transact()?;
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn validate_line(product_id: &str, quantity: i64, unit_price: Money) -> DbResult<()> {
    validate_id("product_id", product_id)?;
    validate_quantity(quantity)?;
    validate_amount("unit_price", unit_price)?;
    Ok(())
}

fn ensure_usable(method: Option<&PaymentMethod>, id: &str) -> DbResult<()> {
    match method {
        None => Err(CoreError::not_found("PaymentMethod", id).into()),
        Some(m) if !m.is_active => Err(CoreError::Inactive {
            entity: "PaymentMethod",
            id: id.to_string(),
        }
        .into()),
        Some(_) => Ok(()),
    }
}

/// The till may have closed between the precondition read and the lease.
async fn ensure_till_open(conn: &mut SqliteConnection) -> DbResult<()> {
    if till::open_exists(conn).await? {
        Ok(())
    } else {
        Err(CoreError::TillLocked.into())
    }
}

async fn restore_stock(conn: &mut SqliteConnection, product_id: &str, quantity: i64) -> DbResult<()> {
    let mut product = StockLedger::lease(conn, product_id)
        .await?
        .ok_or_else(|| CoreError::not_found("Product", product_id))?;
    StockLedger::restore(conn, &mut product, quantity).await
}

/// Books the shortfall as a debt inside a savepoint.
///
/// A failed insert is logged and rolled back to the savepoint; the sale
/// itself still commits.
async fn record_debt(
    conn: &mut SqliteConnection,
    sale: &Sale,
    customer: &str,
    settlement: &Settlement,
    actor: &Actor,
) -> DbResult<Option<Debt>> {
    let mut savepoint = conn.begin().await?;

    match insert_debt(&mut *savepoint, sale, customer, settlement.shortfall, actor).await {
        Ok(debt) => {
            savepoint.commit().await?;
            info!(sale_id = %sale.id, customer = %customer, balance = %debt.balance(), "Debt recorded");
            Ok(Some(debt))
        }
        Err(err) => {
            warn!(sale_id = %sale.id, customer = %customer, error = %err, "Failed to create debt record");
            savepoint.rollback().await?;
            Ok(None)
        }
    }
}

async fn insert_debt(
    conn: &mut SqliteConnection,
    sale: &Sale,
    customer: &str,
    shortfall: Money,
    actor: &Actor,
) -> DbResult<Debt> {
    let customer_contact = debt::latest_contact(&mut *conn, customer).await?;

    let record = Debt {
        id: new_id(),
        customer_name: customer.to_string(),
        customer_contact,
        sale_id: Some(sale.id.clone()),
        amount_cents: shortfall.cents(),
        amount_paid_cents: 0,
        balance_cents: shortfall.cents(),
        debt_date: sale.sale_date,
        due_date: None,
        status: DebtStatus::Pending,
        notes: Some(format!("Credit from sale #{}", sale.id)),
        created_by_id: actor.user_id.clone(),
    };

    debt::insert(conn, &record).await?;
    Ok(record)
}

// =============================================================================
// Unit Tests
// =============================================================================
