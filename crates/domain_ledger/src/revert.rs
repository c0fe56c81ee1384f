//! Stock reversal workflow
//!
//! A revert moves stock back to the main warehouse and then books the
//! offsetting credit. The two steps hit different systems and are not
//! atomic:
//!
//! ```text
//! can_revert ──► inventory.return_stock ──► ledger append ──► Completed
//!     │                  │                        │
//!     ▼                  ▼                        ▼
//!  rejected         Upstream error          Degraded (stock moved,
//!  (nothing moved)  (nothing moved)          credit not booked)
//! ```
//!
//! The return value is split across the matched debits oldest first, and each
//! share is booked as its own `StockReturn` credit linked to its debit. A
//! degraded outcome is never retried or rolled back here. It is returned to
//! the caller with the credits that were booked, the ones that still need to
//! be booked, and is logged at error level for manual reconciliation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use core_kernel::{round_money, with_timeout, Currency, DistributorId, LedgerEntryId, Money};

use crate::catalog::LineItem;
use crate::config::LedgerConfig;
use crate::cost::{CostResolver, UnitCost};
use crate::description::{DescriptionCodec, LineItemKey};
use crate::entry::{LedgerEntry, NewEntry, SourceType};
use crate::error::LedgerError;
use crate::matcher::{DebitView, ReturnMatcher};
use crate::ports::{InventoryPort, StockReturnRequest};
use crate::store::LedgerStore;

/// A requested reversal
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertRequest {
    pub distributor_id: DistributorId,
    pub item: LineItem,
    pub quantity: u32,
    pub notes: Option<String>,
}

/// The share of a return credited against one debit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertAllocation {
    pub debit_id: LedgerEntryId,
    pub amount: Money,
    /// Whole units attributed to this share; may be zero when a unit
    /// straddles two debits
    pub quantity: u32,
}

/// What a reversal would credit, and against which debt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertQuote {
    pub distributor_id: DistributorId,
    pub quantity: u32,
    pub unit_cost: UnitCost,
    /// `unit_cost × quantity × (1 + VAT)`, rounded
    pub return_value: Money,
    /// Return-adjusted balance across matching unpaid debits, rounded
    pub available: Money,
    /// Matching unpaid debits, oldest first
    pub matched_debit_ids: Vec<LedgerEntryId>,
    /// Oldest matching debit, when it alone can absorb the return value
    pub settling_debit_id: Option<LedgerEntryId>,
    /// Per-debit shares, oldest first, summing to `return_value`
    pub allocations: Vec<RevertAllocation>,
}

/// Result of an executed reversal
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RevertOutcome {
    /// Stock moved and every credit is booked
    Completed {
        quote: RevertQuote,
        credits: Vec<LedgerEntry>,
    },
    /// Stock moved but some credits could not be booked
    Degraded {
        quote: RevertQuote,
        stock_returned: u32,
        booked: Vec<LedgerEntry>,
        pending_credits: Vec<NewEntry>,
        error: String,
    },
}

impl RevertOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, RevertOutcome::Degraded { .. })
    }

    pub fn quote(&self) -> &RevertQuote {
        match self {
            RevertOutcome::Completed { quote, .. } | RevertOutcome::Degraded { quote, .. } => quote,
        }
    }

    /// Operator-facing warning for degraded outcomes
    pub fn warning(&self) -> Option<String> {
        match self {
            RevertOutcome::Completed { .. } => None,
            RevertOutcome::Degraded {
                stock_returned,
                pending_credits,
                error,
                ..
            } => {
                let pending: Decimal = pending_credits.iter().map(|c| c.amount.amount()).sum();
                Some(format!(
                    "{} unit(s) returned to the warehouse but credits of {} were not recorded: {}",
                    stock_returned, pending, error
                ))
            }
        }
    }
}

/// Validates and executes stock reversals
#[derive(Clone)]
pub struct RevertWorkflow {
    store: LedgerStore,
    costs: CostResolver,
    inventory: Arc<dyn InventoryPort>,
    matcher: ReturnMatcher,
    timeout: Duration,
    currency: Currency,
}

impl RevertWorkflow {
    pub fn new(
        store: LedgerStore,
        costs: CostResolver,
        inventory: Arc<dyn InventoryPort>,
        config: &LedgerConfig,
    ) -> Self {
        Self {
            store,
            costs,
            inventory,
            matcher: ReturnMatcher::from_config(config),
            timeout: config.collaborator_timeout(),
            currency: config.currency,
        }
    }

    /// Checks that enough matched, unpaid debt exists to absorb the return
    ///
    /// Never calls the inventory.
    pub async fn can_revert(
        &self,
        distributor_id: DistributorId,
        item: &LineItem,
        quantity: u32,
    ) -> Result<RevertQuote, LedgerError> {
        if quantity == 0 {
            return Err(LedgerError::validation("quantity must be greater than zero"));
        }
        if distributor_id.is_nil() {
            return Err(LedgerError::validation("distributor_id is required"));
        }

        let unit_cost = self.costs.resolve(item).await?;
        let required = round_money(self.costs.return_value(&unit_cost, quantity), 2);
        if required <= Decimal::ZERO {
            return Err(LedgerError::validation("return value rounds to zero"));
        }

        let entries = self.store.entries(distributor_id).await?;
        let key = LineItemKey::from_names(&item.product_name, &item.variant_name);
        let mut open: Vec<DebitView> = entries
            .iter()
            .filter(|e| e.is_debit() && DescriptionCodec::extract_item(&e.description) == key)
            .map(|debit| self.matcher.assess(debit, &entries))
            .filter(|view| view.exact_remaining() > Decimal::ZERO)
            .collect();
        open.sort_by(|a, b| {
            a.debit
                .created_at
                .cmp(&b.debit.created_at)
                .then_with(|| a.debit.id.cmp(&b.debit.id))
        });

        let available: Decimal = open.iter().map(|v| v.remaining_amount.amount()).sum();
        if open.is_empty() || available < required {
            warn!(
                distributor_id = %distributor_id,
                product = %item.product_name,
                variant = %item.variant_name,
                quantity,
                available = %available,
                required = %required,
                "revert rejected: insufficient matched balance"
            );
            return Err(LedgerError::InsufficientBalance { available, required });
        }

        let allocations = self.allocate(&open, required, quantity);
        let settling_debit_id = match allocations.as_slice() {
            [only] => Some(only.debit_id),
            _ => None,
        };

        Ok(RevertQuote {
            distributor_id,
            quantity,
            unit_cost,
            return_value: Money::new(required, self.currency).round_to_currency(),
            available: Money::new(available, self.currency).round_to_currency(),
            matched_debit_ids: open.iter().map(|v| v.debit.id).collect(),
            settling_debit_id,
            allocations,
        })
    }

    /// Splits `required` across `open` (oldest first) until it is absorbed
    ///
    /// Units follow the cumulative share of the amount, so the per-debit
    /// quantities always add up to `quantity`.
    fn allocate(&self, open: &[DebitView], required: Decimal, quantity: u32) -> Vec<RevertAllocation> {
        let mut shares = Vec::new();
        let mut left = required;
        for view in open {
            if left <= Decimal::ZERO {
                break;
            }
            let take = view.remaining_amount.amount().min(left);
            if take <= Decimal::ZERO {
                continue;
            }
            shares.push((view.debit.id, take));
            left -= take;
        }

        let mut allocations = Vec::with_capacity(shares.len());
        let mut cumulative = Decimal::ZERO;
        let mut units_before = 0u32;
        let last = shares.len().saturating_sub(1);
        for (i, (debit_id, amount)) in shares.into_iter().enumerate() {
            cumulative += amount;
            let units_through = if i == last {
                quantity
            } else {
                round_money(cumulative / required * Decimal::from(quantity), 0)
                    .to_u32()
                    .unwrap_or(quantity)
                    .clamp(units_before, quantity)
            };
            allocations.push(RevertAllocation {
                debit_id,
                amount: Money::new(amount, self.currency).round_to_currency(),
                quantity: units_through - units_before,
            });
            units_before = units_through;
        }
        allocations
    }

    /// Moves the stock, then books one linked credit per allocation in `quote`
    pub async fn execute_revert(
        &self,
        request: &RevertRequest,
        quote: RevertQuote,
    ) -> Result<RevertOutcome, LedgerError> {
        if quote.quantity != request.quantity || quote.distributor_id != request.distributor_id {
            return Err(LedgerError::validation("quote does not belong to this revert request"));
        }
        self.store.require_actor().await?;

        if quote.allocations.is_empty() {
            return Err(LedgerError::validation("quote has no debits to credit"));
        }

        let description = DescriptionCodec::render_return(
            request.quantity,
            &request.item.product_name,
            &request.item.variant_name,
        );
        let notes = request.notes.clone().unwrap_or_else(|| description.clone());
        let stock = StockReturnRequest {
            distributor_id: request.distributor_id,
            product_id: request.item.product_id,
            variant_id: request.item.variant_id,
            quantity: request.quantity,
            notes: notes.clone(),
        };
        with_timeout("inventory_return_stock", self.timeout, self.inventory.return_stock(&stock))
            .await
            .map_err(|e| {
                warn!(
                    distributor_id = %request.distributor_id,
                    variant_id = %request.item.variant_id,
                    error = %e,
                    "inventory rejected stock return; ledger untouched"
                );
                LedgerError::Upstream(e)
            })?;

        let paid_on = Utc::now();
        let credits: Vec<NewEntry> = quote
            .allocations
            .iter()
            .map(|share| {
                NewEntry::credit(
                    request.distributor_id,
                    share.amount,
                    DescriptionCodec::render_return(
                        share.quantity,
                        &request.item.product_name,
                        &request.item.variant_name,
                    ),
                    SourceType::StockReturn,
                    share.debit_id.into(),
                )
                .paid_on(paid_on)
                .with_notes(notes.clone())
                .settles(share.debit_id)
            })
            .collect();

        let mut booked = Vec::with_capacity(credits.len());
        let mut credits = credits.into_iter();
        while let Some(credit) = credits.next() {
            match self.store.append(credit.clone()).await {
                Ok(entry) => booked.push(entry),
                Err(e) => {
                    let pending: Vec<NewEntry> = std::iter::once(credit).chain(credits).collect();
                    let unbooked: Decimal = pending.iter().map(|c| c.amount.amount()).sum();
                    error!(
                        distributor_id = %request.distributor_id,
                        variant_id = %request.item.variant_id,
                        quantity = request.quantity,
                        amount = %quote.return_value.amount(),
                        unbooked = %unbooked,
                        booked_credits = booked.len(),
                        error = %e,
                        manual_reconciliation = true,
                        "stock returned but ledger credit failed"
                    );
                    return Ok(RevertOutcome::Degraded {
                        quote,
                        stock_returned: request.quantity,
                        booked,
                        pending_credits: pending,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            distributor_id = %request.distributor_id,
            credits = booked.len(),
            quantity = request.quantity,
            amount = %quote.return_value.amount(),
            cost_source = %quote.unit_cost.source,
            "stock revert completed"
        );
        Ok(RevertOutcome::Completed { quote, credits: booked })
    }

    /// `can_revert` followed by `execute_revert`
    pub async fn revert_transfer(&self, request: &RevertRequest) -> Result<RevertOutcome, LedgerError> {
        let quote = self
            .can_revert(request.distributor_id, &request.item, request.quantity)
            .await?;
        self.execute_revert(request, quote).await
    }
}
