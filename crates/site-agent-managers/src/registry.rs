//! The manager registry: a write-once handle table assigned once at
//! startup and never mutated thereafter, so readers need no lock. Every
//! manager is constructed with a handle back to this registry so
//! cross-kind lookups (the Instance manager validating an InstanceType) go
//! through it rather than a raw peer pointer.

use std::collections::HashMap;
use std::sync::Arc;

use site_agent_core::{ResourceKind, SiteAgentError};
use strum::IntoEnumIterator;

use crate::manager::ResourceManager;

pub struct ManagerRegistry {
    managers: HashMap<ResourceKind, Arc<dyn ResourceManager>>,
}

impl ManagerRegistry {
    pub fn get(&self, kind: ResourceKind) -> Option<&Arc<dyn ResourceManager>> {
        self.managers.get(&kind)
    }

    /// Routing to an unregistered kind is a startup error, never a runtime
    /// one. Callers that already know the kind was validated at `build()`
    /// time can use this to avoid `Option`-handling at every dispatch
    /// site.
    pub fn require(&self, kind: ResourceKind) -> Result<&Arc<dyn ResourceManager>, SiteAgentError> {
        self.get(kind)
            .ok_or_else(|| SiteAgentError::Config(format!("no manager registered for kind {kind:?}")))
    }

    pub fn kinds(&self) -> impl Iterator<Item = ResourceKind> + '_ {
        self.managers.keys().copied()
    }

    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn ResourceManager>> {
        self.managers.values()
    }
}

#[derive(Default)]
pub struct ManagerRegistryBuilder {
    managers: HashMap<ResourceKind, Arc<dyn ResourceManager>>,
}

impl ManagerRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, manager: Arc<dyn ResourceManager>) -> Self {
        self.managers.insert(manager.kind(), manager);
        self
    }

    /// Validates that every `ResourceKind` has exactly one manager before
    /// handing out the registry: routing to an unregistered kind must be a
    /// fatal configuration error at startup, never a runtime one. An
    /// incomplete registry never leaves this function.
    pub fn build(self) -> Result<Arc<ManagerRegistry>, SiteAgentError> {
        let missing: Vec<&'static str> = ResourceKind::iter()
            .filter(|kind| !self.managers.contains_key(kind))
            .map(ResourceKind::as_str)
            .collect();

        if !missing.is_empty() {
            return Err(SiteAgentError::Config(format!(
                "missing resource managers for kinds: {}",
                missing.join(", ")
            )));
        }

        Ok(Arc::new(ManagerRegistry { managers: self.managers }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::{ActivityContext, CronRegistration, PublisherRegistration, SubscriberRegistration};
    use async_trait::async_trait;
    use site_agent_core::{ActivityCounters, SiteAgentResult};
    use std::sync::Arc;

    struct StubManager {
        kind: ResourceKind,
        counters: Arc<ActivityCounters>,
    }

    #[async_trait]
    impl ResourceManager for StubManager {
        fn kind(&self) -> ResourceKind {
            self.kind
        }

        fn counters(&self) -> &ActivityCounters {
            &self.counters
        }

        fn counters_handle(&self) -> Arc<ActivityCounters> {
            self.counters.clone()
        }

        fn register_subscriber(&self) -> SubscriberRegistration {
            SubscriberRegistration { workflow_names: vec![] }
        }

        fn register_publisher(&self) -> Option<PublisherRegistration> {
            None
        }

        fn register_cron(&self) -> Option<CronRegistration> {
            None
        }

        async fn activity(&self, _name: &str, _ctx: ActivityContext, _payload: Vec<u8>) -> SiteAgentResult<Vec<u8>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn build_fails_when_a_kind_is_missing() {
        let builder = ManagerRegistryBuilder::new().register(Arc::new(StubManager {
            kind: ResourceKind::Vpc,
            counters: Arc::new(ActivityCounters::new()),
        }));
        assert!(builder.build().is_err());
    }

    #[test]
    fn build_succeeds_when_every_kind_is_registered() {
        let mut builder = ManagerRegistryBuilder::new();
        for kind in ResourceKind::iter() {
            builder = builder.register(Arc::new(StubManager {
                kind,
                counters: Arc::new(ActivityCounters::new()),
            }));
        }
        let registry = builder.build().expect("all kinds registered");
        assert!(registry.get(ResourceKind::Rack).is_some());
        assert!(registry.require(ResourceKind::Tray).is_ok());
    }
}
