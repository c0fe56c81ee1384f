//! Test Data Builders
//!
//! [`LedgerEntryBuilder`] materialises entries directly, bypassing the
//! store, so tests can seed aged or hand-linked history.
//! [`TestLedger`] wires a [`LedgerService`] to the in-memory adapters.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use core_kernel::{ActorId, DistributorId, LedgerEntryId, Money, TransferId};
use domain_ledger::{
    DescriptionCodec, EntryType, FixedIdentity, InMemoryLedger, LedgerConfig, LedgerEntry,
    LedgerService, LineItem, MockCatalog, MockInventory, NewEntry, Product, RegisterDebit,
    RevertRequest, SourceType, Variant,
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use crate::fixtures::{CatalogFixtures, IdFixtures, MoneyFixtures};

/// Builder for ledger entries
pub struct LedgerEntryBuilder {
    entry_type: EntryType,
    distributor_id: DistributorId,
    amount: Money,
    description: String,
    source_type: SourceType,
    source_id: Uuid,
    created_at: DateTime<Utc>,
    created_by: ActorId,
    due_date: Option<DateTime<Utc>>,
    settles: Option<LedgerEntryId>,
}

impl LedgerEntryBuilder {
    /// A transfer debit for two units of the catalog fixture
    pub fn debit() -> Self {
        Self {
            entry_type: EntryType::Debit,
            distributor_id: IdFixtures::distributor_id(),
            amount: MoneyFixtures::usd_transfer(),
            description: DescriptionCodec::render_transfer(
                2,
                CatalogFixtures::PRODUCT_NAME,
                CatalogFixtures::VARIANT_NAME,
            ),
            source_type: SourceType::Transfer,
            source_id: Uuid::new_v4(),
            created_at: Utc::now(),
            created_by: IdFixtures::admin(),
            due_date: None,
            settles: None,
        }
    }

    /// A stock-return credit for one unit of the catalog fixture
    pub fn return_credit() -> Self {
        Self {
            entry_type: EntryType::Credit,
            amount: MoneyFixtures::usd(dec!(12.50)),
            description: DescriptionCodec::render_return(
                1,
                CatalogFixtures::PRODUCT_NAME,
                CatalogFixtures::VARIANT_NAME,
            ),
            source_type: SourceType::StockReturn,
            ..Self::debit()
        }
    }

    /// A manual payment credit
    pub fn payment() -> Self {
        Self {
            entry_type: EntryType::Credit,
            amount: MoneyFixtures::usd(dec!(10.00)),
            description: "Pago en efectivo".to_string(),
            source_type: SourceType::ManualPayment,
            ..Self::debit()
        }
    }

    pub fn distributor(mut self, distributor_id: DistributorId) -> Self {
        self.distributor_id = distributor_id;
        self
    }

    pub fn amount(mut self, amount: Decimal) -> Self {
        self.amount = MoneyFixtures::usd(amount);
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn created_by(mut self, actor: ActorId) -> Self {
        self.created_by = actor;
        self
    }

    pub fn due(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    /// Links a credit to the debit it settles
    pub fn settles(mut self, debit: &LedgerEntry) -> Self {
        self.settles = Some(debit.id);
        self
    }

    pub fn build(self) -> LedgerEntry {
        let mut entry = match self.entry_type {
            EntryType::Debit => NewEntry::debit(
                self.distributor_id,
                self.amount,
                self.description,
                self.source_type,
                self.source_id,
            ),
            EntryType::Credit => NewEntry::credit(
                self.distributor_id,
                self.amount,
                self.description,
                self.source_type,
                self.source_id,
            ),
        };
        if let Some(due_date) = self.due_date {
            entry = entry.due(due_date);
        }
        if let Some(debit_id) = self.settles {
            entry = entry.settles(debit_id);
        }
        entry.into_entry(LedgerEntryId::new_v7(), self.created_at, self.created_by)
    }
}

/// A ledger service over in-memory adapters and the catalog fixture
pub struct TestLedger {
    pub service: LedgerService,
    pub ledger: Arc<InMemoryLedger>,
    pub catalog: Arc<MockCatalog>,
    pub inventory: Arc<MockInventory>,
    pub distributor: DistributorId,
    pub product: Product,
    pub variant: Variant,
}

impl Default for TestLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TestLedger {
    /// Variant cost 12.50, acting as `admin-1`
    pub fn new() -> Self {
        Self::with_variant_cost(Some(dec!(12.50)))
    }

    pub fn with_variant_cost(variant_cost: Option<Decimal>) -> Self {
        let product = CatalogFixtures::product();
        let variant = CatalogFixtures::variant(&product, variant_cost);
        let ledger = Arc::new(InMemoryLedger::new());
        let catalog = Arc::new(
            MockCatalog::new()
                .with_product(product.clone())
                .with_variant(variant.clone()),
        );
        let inventory = Arc::new(MockInventory::new());
        let service = LedgerService::new(
            ledger.clone(),
            catalog.clone(),
            inventory.clone(),
            Arc::new(FixedIdentity::new(IdFixtures::admin())),
            LedgerConfig::default(),
        )
        .unwrap();

        Self {
            service,
            ledger,
            catalog,
            inventory,
            distributor: IdFixtures::distributor_id(),
            product,
            variant,
        }
    }

    pub fn item(&self) -> LineItem {
        CatalogFixtures::line_item(&self.product, &self.variant)
    }

    /// Books a transfer debit for the fixture item through the service
    pub async fn transfer(&self, quantity: u32, amount: Decimal) -> LedgerEntry {
        self.service
            .register_debit(RegisterDebit::for_transfer(
                self.distributor,
                TransferId::new(),
                amount,
                quantity,
                &self.product.name,
                &self.variant.name,
            ))
            .await
            .unwrap()
    }

    pub fn revert(&self, quantity: u32) -> RevertRequest {
        RevertRequest {
            distributor_id: self.distributor,
            item: self.item(),
            quantity,
            notes: None,
        }
    }

    /// Seeds an entry built for this distributor
    pub async fn seed(&self, builder: LedgerEntryBuilder) -> LedgerEntry {
        let entry = builder.distributor(self.distributor).build();
        self.ledger.seed(entry.clone()).await;
        entry
    }
}
