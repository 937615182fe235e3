//! Content selection - decides which fetched products get published

use std::collections::HashSet;

use crate::model::Product;

/// Pick up to `quota` products from a fetched batch, in fetch order.
///
/// Products whose marketplace ID appears in `recently_posted` are excluded
/// outright, as are repeated IDs within the batch (first occurrence wins).
/// The result can be shorter than `quota` when the batch runs dry; a zero
/// quota yields an empty selection.
pub fn select_products(
    fetched: &[Product],
    quota: usize,
    recently_posted: &HashSet<String>,
) -> Vec<Product> {
    let mut taken: HashSet<&str> = HashSet::new();
    let mut selected = Vec::new();

    for product in fetched {
        if selected.len() >= quota {
            break;
        }
        if recently_posted.contains(&product.marketplace_id) {
            continue;
        }
        if !taken.insert(product.marketplace_id.as_str()) {
            continue;
        }
        selected.push(product.clone());
    }

    selected
}
