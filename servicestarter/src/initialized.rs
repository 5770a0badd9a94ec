//! Service instance with tenant bootstrap
//!
//! `InitializedMicroservice` behaves like [`Microservice`] but registers its
//! application with the run's pool up front, and after the process is started
//! runs the tenant/security bootstrap against it. `start` only returns once
//! the bootstrap has finished.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use shared::instance_info;
use shared::logging::{log_failure, Stage};

use crate::error::StarterResult;
use crate::microservice::{Microservice, MicroserviceConfig};
use crate::traits::{ApiFactory, ArtifactLocator, ResourcePool, TenantInitializer};

pub struct InitializedMicroservice<T> {
    inner: Microservice<T>,
    tenant: Arc<dyn TenantInitializer>,
}

impl<T> InitializedMicroservice<T> {
    /// Build the instance and register its application with the pool
    ///
    /// # Errors
    /// As [`Microservice::new`].
    pub fn new(
        config: MicroserviceConfig,
        pool: Arc<dyn ResourcePool>,
        locator: Arc<dyn ArtifactLocator>,
        tenant: Arc<dyn TenantInitializer>,
    ) -> StarterResult<Self> {
        let inner = Microservice::new(config, pool, locator)?;
        inner.pool().register_application(inner.name());
        Ok(Self { inner, tenant })
    }

    pub fn with_api_factory(self, factory: impl ApiFactory<T> + 'static) -> Self {
        Self {
            inner: self.inner.with_api_factory(factory),
            tenant: self.tenant,
        }
    }

    /// Start the process, then bootstrap the tenant in it
    pub async fn start(&mut self) -> StarterResult<()> {
        self.inner.start().await?;

        let uri = self.inner.uri();
        if let Err(e) = self.tenant.initialize_tenant(self.inner.name(), &uri).await {
            log_failure(self.inner.name(), Stage::TenantInitialization, &e);
            return Err(e);
        }

        instance_info!(self.inner.name(), "🔐 Tenant initialized at {}", uri);
        Ok(())
    }

}

impl<T> Deref for InitializedMicroservice<T> {
    type Target = Microservice<T>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<T> DerefMut for InitializedMicroservice<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner
    }
}
