//! Provider registry — routes share types to registered providers.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::info;

use sharehub_core::error::AppError;
use sharehub_core::result::AppResult;
use sharehub_entity::share::ShareType;

use crate::provider::ShareProvider;

/// Explicit, ordered registry mapping share types to providers.
///
/// Populated at process start; additional provider kinds may still be
/// registered late. One provider per share type, plus an optional
/// fallback consulted for types no provider claimed. Registration order
/// is preserved for operations that fan out to every provider.
#[derive(Default)]
pub struct ProviderRegistry {
    inner: RwLock<Inner>,
}

#[derive(Default)]
struct Inner {
    ordered: Vec<Arc<dyn ShareProvider>>,
    by_type: HashMap<ShareType, Arc<dyn ShareProvider>>,
    fallback: Option<Arc<dyn ShareProvider>>,
}

impl ProviderRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider for every share type it supports.
    ///
    /// Fails if another provider uses the same identifier or already
    /// claims one of the types.
    pub fn register(&self, provider: Arc<dyn ShareProvider>) -> AppResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner
            .ordered
            .iter()
            .any(|p| p.identifier() == provider.identifier())
        {
            return Err(AppError::provider(format!(
                "A share provider with id '{}' is already registered",
                provider.identifier()
            )));
        }

        for share_type in provider.supported_types() {
            if let Some(existing) = inner.by_type.get(share_type) {
                return Err(AppError::provider(format!(
                    "Share type '{}' is already handled by provider '{}'",
                    share_type.as_str(),
                    existing.identifier()
                )));
            }
        }

        for share_type in provider.supported_types() {
            inner.by_type.insert(*share_type, Arc::clone(&provider));
        }
        info!(
            provider = provider.identifier(),
            types = ?provider.supported_types(),
            "Share provider registered"
        );
        inner.ordered.push(provider);
        Ok(())
    }

    /// Register the fallback provider consulted for share types no
    /// registered provider claims.
    pub fn register_fallback(&self, provider: Arc<dyn ShareProvider>) -> AppResult<()> {
        let mut inner = self.inner.write().unwrap_or_else(PoisonError::into_inner);

        if inner.fallback.is_some() {
            return Err(AppError::provider(
                "A fallback share provider is already registered",
            ));
        }
        info!(provider = provider.identifier(), "Fallback share provider registered");
        inner.ordered.push(Arc::clone(&provider));
        inner.fallback = Some(provider);
        Ok(())
    }

    /// The provider responsible for a share type.
    pub fn provider_for_type(&self, share_type: ShareType) -> AppResult<Arc<dyn ShareProvider>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .by_type
            .get(&share_type)
            .or(inner.fallback.as_ref())
            .cloned()
            .ok_or_else(|| {
                AppError::provider(format!(
                    "No share provider registered for type '{}'",
                    share_type.as_str()
                ))
            })
    }

    /// Whether some provider handles the share type.
    pub fn has_provider_for(&self, share_type: ShareType) -> bool {
        self.provider_for_type(share_type).is_ok()
    }

    /// Look up a provider by its identifier (the first half of a full
    /// share id).
    pub fn provider_by_id(&self, id: &str) -> AppResult<Arc<dyn ShareProvider>> {
        let inner = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        inner
            .ordered
            .iter()
            .find(|p| p.identifier() == id)
            .cloned()
            .ok_or_else(|| AppError::provider(format!("No share provider with id '{id}'")))
    }

    /// All registered providers in registration order.
    pub fn all(&self) -> Vec<Arc<dyn ShareProvider>> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .ordered
            .clone()
    }
}
