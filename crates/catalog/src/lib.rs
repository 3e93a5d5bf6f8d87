//! Catalog reference data: products, categories and payment methods.
//!
//! Categories carry the policy inputs of settlement and compensation: whether
//! a product category earns salesman commission, and the markup, florist sale
//! percent and creation fee of an assembly category.

pub mod catalog;

pub use catalog::{AssemblyCategory, Catalog, PaymentMethod, Product, ProductCategory};
