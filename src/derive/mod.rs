//! Derived-column functions: product-label simplification and packaging
//! classification.
//!
//! Both functions are total: any input, however malformed, maps to a
//! documented fallback (the raw product code, or the `Other` category).

mod label;
mod packaging;

pub use label::simplify_product_name;
pub use packaging::{classify_packaging, PackagingCategory, PackagingClassifier};
