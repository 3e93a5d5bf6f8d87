use tracing::instrument;

use petalerp_catalog::{AssemblyCategory, PaymentMethod, Product, ProductCategory};
use petalerp_core::entity::{find, insert};
use petalerp_core::{
    AssemblyCategoryId, ClientId, DomainError, PaymentMethodId, ProductCategoryId, ProductId,
    WorkerId, ensure_non_negative,
};
use petalerp_events::EventBus;
use petalerp_parties::{Client, Worker, WorkerKind};

use super::BackOffice;
use crate::error::BackOfficeResult;
use crate::events::Envelope;

impl<B> BackOffice<B>
where
    B: EventBus<Envelope>,
{
    /// `salesman_commission` decides whether its products earn sale commission.
    #[instrument(skip(self), err)]
    pub fn register_product_category(
        &self,
        name: String,
        salesman_commission: bool,
    ) -> BackOfficeResult<ProductCategoryId> {
        self.run("register_product_category", |tx| {
            tx.state.catalog.add_product_category(ProductCategory {
                id: ProductCategoryId::new(),
                name,
                salesman_commission,
            })
        })
    }

    #[instrument(skip(self), err)]
    pub fn register_product(
        &self,
        name: String,
        category_id: ProductCategoryId,
    ) -> BackOfficeResult<ProductId> {
        self.run("register_product", |tx| {
            tx.state.catalog.add_product(Product {
                id: ProductId::new(),
                name,
                category_id,
            })
        })
    }

    #[instrument(skip(self), err)]
    pub fn register_assembly_category(
        &self,
        name: String,
        charge_percent: u32,
        florist_sale_percent: u32,
        creation_fee: i64,
    ) -> BackOfficeResult<AssemblyCategoryId> {
        self.run("register_assembly_category", |tx| {
            tx.state.catalog.add_assembly_category(AssemblyCategory {
                id: AssemblyCategoryId::new(),
                name,
                charge_percent,
                florist_sale_percent,
                creation_fee,
            })
        })
    }

    #[instrument(skip(self), err)]
    pub fn register_payment_method(&self, name: String) -> BackOfficeResult<PaymentMethodId> {
        self.run("register_payment_method", |tx| {
            tx.state.catalog.add_payment_method(PaymentMethod {
                id: PaymentMethodId::new(),
                name,
            })
        })
    }

    /// `assembly_rate` only takes effect for trainees.
    #[instrument(skip(self), err)]
    pub fn register_worker(
        &self,
        name: String,
        kind: WorkerKind,
        assembly_rate: Option<i64>,
    ) -> BackOfficeResult<WorkerId> {
        self.run("register_worker", |tx| {
            if name.trim().is_empty() {
                return Err(DomainError::validation("worker name cannot be empty"));
            }
            if let Some(rate) = assembly_rate {
                ensure_non_negative(rate, "assembly rate")?;
            }
            let worker = Worker {
                id: WorkerId::new(),
                name,
                kind,
                assembly_rate,
            };
            Ok(insert(&mut tx.state.workers, worker))
        })
    }

    #[instrument(skip(self), err)]
    pub fn register_client(&self, name: String, auto_discount: bool) -> BackOfficeResult<ClientId> {
        self.run("register_client", |tx| {
            if name.trim().is_empty() {
                return Err(DomainError::validation("client name cannot be empty"));
            }
            Ok(insert(&mut tx.state.clients, Client::new(name, auto_discount)))
        })
    }

    pub fn client(&self, client_id: ClientId) -> BackOfficeResult<Client> {
        self.read(|s| find(&s.clients, client_id).cloned())
    }

    pub fn worker(&self, worker_id: WorkerId) -> BackOfficeResult<Worker> {
        self.read(|s| find(&s.workers, worker_id).cloned())
    }
}
