//! Product-to-policy registry.
//!
//! The registry maps product identifiers to score policies. It is an
//! explicit object, constructed once at startup and handed to the engine as
//! a constructor dependency, so tests can build isolated registries instead
//! of sharing process-global state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::ids::ProductId;
use crate::policy::ScorePolicy;

/// The reserved product identifier used as the fallback binding.
pub const DEFAULT_PRODUCT_ID: &str = "default";

/// Registry of score policies keyed by product identifier.
///
/// Bindings are created at registration time and never mutated afterwards;
/// re-registering a product is a warned no-op and the original binding wins.
#[derive(Default)]
pub struct PolicyRegistry {
    policies: HashMap<ProductId, Arc<dyn ScorePolicy>>,
}

impl PolicyRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a policy to a product identifier.
    ///
    /// First registration wins: if a binding already exists for
    /// `product_id`, this logs a warning and leaves the original in place.
    pub fn register(&mut self, product_id: ProductId, policy: Arc<dyn ScorePolicy>) {
        tracing::info!(product_id = %product_id, "registering score policy");
        if self.policies.contains_key(&product_id) {
            tracing::warn!(
                product_id = %product_id,
                "unable to register score policy: a policy for this product already exists"
            );
            return;
        }
        self.policies.insert(product_id, policy);
    }

    /// Bind the fallback policy under the reserved `"default"` identifier.
    pub fn register_default(&mut self, policy: Arc<dyn ScorePolicy>) {
        self.register(ProductId::new(DEFAULT_PRODUCT_ID), policy);
    }

    /// Look up the policy for a product.
    ///
    /// Falls back to the `"default"` binding when `allow_default` is true and
    /// no product-specific binding exists. Returns `None` when nothing
    /// resolves.
    #[must_use]
    pub fn resolve(
        &self,
        product_id: &ProductId,
        allow_default: bool,
    ) -> Option<Arc<dyn ScorePolicy>> {
        let specific = self.policies.get(product_id).cloned();
        if !allow_default {
            return specific;
        }
        specific.or_else(|| {
            self.policies
                .get(&ProductId::new(DEFAULT_PRODUCT_ID))
                .cloned()
        })
    }
}
