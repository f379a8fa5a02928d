//! Per-kind reconciliation-safety and idempotence policy, resolved here
//! once rather than left for each manager to guess at runtime.

use site_agent_core::ResourceKind;

/// What happens when the Site reports a resource the Cloud no longer lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeletePolicy {
    /// Issue a `Delete*` RPC against the site controller.
    AutoDelete,
    /// Never delete; mark `ResourceStatus::Orphaned` and report it back to
    /// the Cloud as a discovery instead.
    MarkOrphaned,
}

/// What an activity should do when a create RPC returns `AlreadyExists`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlreadyExistsPolicy {
    /// Treat as success only if this exact `TransactionId` has already been
    /// recorded as attempted; otherwise escalate (two different intents
    /// colliding on the same name is a real conflict).
    IdempotentIfSeen,
    /// Always treat as success — the kind has no identity fields beyond the
    /// ones the Cloud already fixed, so a second create is never a conflict
    /// (catalog data, generated fabric partitions).
    AlwaysIdempotent,
    /// Always escalate; there is no safe way to treat a collision as success
    /// without risking merging two distinct tenants/services.
    AlwaysEscalate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KindPolicy {
    pub delete_policy: DeletePolicy,
    pub already_exists_policy: AlreadyExistsPolicy,
}

/// The authoritative per-kind policy table.
pub fn kind_policy(kind: ResourceKind) -> KindPolicy {
    use AlreadyExistsPolicy::*;
    use DeletePolicy::*;
    use ResourceKind::*;

    match kind {
        Machine | ExpectedMachine | Tray | Rack => KindPolicy {
            delete_policy: MarkOrphaned,
            already_exists_policy: IdempotentIfSeen,
        },
        Vpc | Subnet | Instance | NetworkSecurityGroup | SshKeyGroup => KindPolicy {
            delete_policy: AutoDelete,
            already_exists_policy: IdempotentIfSeen,
        },
        InfiniBandPartition | NvLinkLogicalPartition => KindPolicy {
            delete_policy: AutoDelete,
            already_exists_policy: AlwaysIdempotent,
        },
        DpuExtensionService | Tenant => KindPolicy {
            delete_policy: AutoDelete,
            already_exists_policy: AlwaysEscalate,
        },
        InstanceType | Sku | OperatingSystem => KindPolicy {
            delete_policy: AutoDelete,
            already_exists_policy: AlwaysIdempotent,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn every_kind_has_a_policy() {
        for kind in ResourceKind::iter() {
            let _ = kind_policy(kind);
        }
    }

    #[test]
    fn physical_inventory_kinds_are_never_auto_deleted() {
        for kind in ResourceKind::iter() {
            if kind.is_physical_inventory() {
                assert_eq!(kind_policy(kind).delete_policy, DeletePolicy::MarkOrphaned);
            }
        }
    }
}
