use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use petalerp_core::entity::{find, insert};
use petalerp_core::{
    AssemblyCategoryId, DomainError, DomainResult, Entity, PaymentMethodId, ProductCategoryId,
    ProductId, ensure_non_negative,
};

/// Product category; decides whether sales of its products earn salesman commission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: ProductCategoryId,
    pub name: String,
    pub salesman_commission: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub category_id: ProductCategoryId,
}

/// Assembly (bundle) category, effectively the sales channel of an assembly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyCategory {
    pub id: AssemblyCategoryId,
    pub name: String,
    /// Markup applied to the line subtotal when an assembly is finished.
    pub charge_percent: u32,
    /// Florist commission on the assembly's sale price.
    pub florist_sale_percent: u32,
    /// Flat creation compensation, in smallest currency unit.
    pub creation_fee: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: PaymentMethodId,
    pub name: String,
}

impl Entity for ProductCategory {
    type Id = ProductCategoryId;
    const KIND: &'static str = "product category";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for Product {
    type Id = ProductId;
    const KIND: &'static str = "product";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for AssemblyCategory {
    type Id = AssemblyCategoryId;
    const KIND: &'static str = "assembly category";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Entity for PaymentMethod {
    type Id = PaymentMethodId;
    const KIND: &'static str = "payment method";

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Registered reference data.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    product_categories: BTreeMap<ProductCategoryId, ProductCategory>,
    products: BTreeMap<ProductId, Product>,
    assembly_categories: BTreeMap<AssemblyCategoryId, AssemblyCategory>,
    payment_methods: BTreeMap<PaymentMethodId, PaymentMethod>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product_category(&mut self, category: ProductCategory) -> DomainResult<ProductCategoryId> {
        ensure_name(&category.name)?;
        Ok(insert(&mut self.product_categories, category))
    }

    pub fn add_product(&mut self, product: Product) -> DomainResult<ProductId> {
        ensure_name(&product.name)?;
        find(&self.product_categories, product.category_id)?;
        Ok(insert(&mut self.products, product))
    }

    pub fn add_assembly_category(
        &mut self,
        category: AssemblyCategory,
    ) -> DomainResult<AssemblyCategoryId> {
        ensure_name(&category.name)?;
        ensure_non_negative(category.creation_fee, "creation fee")?;
        Ok(insert(&mut self.assembly_categories, category))
    }

    pub fn add_payment_method(&mut self, method: PaymentMethod) -> DomainResult<PaymentMethodId> {
        ensure_name(&method.name)?;
        Ok(insert(&mut self.payment_methods, method))
    }

    pub fn product(&self, id: ProductId) -> DomainResult<&Product> {
        find(&self.products, id)
    }

    pub fn assembly_category(&self, id: AssemblyCategoryId) -> DomainResult<&AssemblyCategory> {
        find(&self.assembly_categories, id)
    }

    /// Payment method lookup with its dedicated error kind.
    pub fn payment_method(&self, id: PaymentMethodId) -> DomainResult<&PaymentMethod> {
        self.payment_methods
            .get(&id)
            .ok_or(DomainError::PaymentMethodNotFound(id))
    }

    /// Whether sales of `product` earn salesman commission.
    pub fn earns_salesman_commission(&self, product: ProductId) -> DomainResult<bool> {
        let product = self.product(product)?;
        let category = find(&self.product_categories, product.category_id)?;
        Ok(category.salesman_commission)
    }
}

fn ensure_name(name: &str) -> DomainResult<()> {
    if name.trim().is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    Ok(())
}
