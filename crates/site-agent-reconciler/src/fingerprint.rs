//! Canonical fingerprint hashing: a full 32-byte `blake3` digest over a
//! resource's name, parentage, status, and labels/attributes, used to
//! detect drift between the Cloud's and the site's view of the same
//! `cloud_id` without comparing every field by hand.
//!
//! A truncated digest would keep the per-entry memory bound tighter, but
//! the per-tick working set (tens of thousands of resources, not millions)
//! makes that not worth the collision risk it buys back — the full 32
//! bytes are kept per entry instead. See `DESIGN.md`.

use std::collections::BTreeMap;

/// Hashes `name`, `parent`, `status` and the two label/attribute maps in a
/// fixed field order with `\0` separators, so two resources that happen to
/// share a name but differ only in, say, an attribute value never collide.
pub fn fingerprint(
    name: &str,
    parent: &str,
    status: i32,
    labels: &BTreeMap<String, String>,
    attributes: &BTreeMap<String, String>,
) -> [u8; 32] {
    let mut hasher = blake3::Hasher::new();
    hasher.update(name.as_bytes());
    hasher.update(b"\0");
    hasher.update(parent.as_bytes());
    hasher.update(b"\0");
    hasher.update(&status.to_le_bytes());
    for (k, v) in labels {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"\0");
    }
    hasher.update(b"\0");
    for (k, v) in attributes {
        hasher.update(k.as_bytes());
        hasher.update(b"=");
        hasher.update(v.as_bytes());
        hasher.update(b"\0");
    }
    *hasher.finalize().as_bytes()
}

/// `BTreeMap` gives sorted-order iteration for free, which is what makes
/// `fingerprint` deterministic regardless of wire order.
pub fn labels_to_map(labels: &[site_agent_proto::common::Label]) -> BTreeMap<String, String> {
    labels.iter().map(|l| (l.key.clone(), l.value.clone())).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_inputs_hash_identically() {
        let labels = BTreeMap::new();
        let attrs = BTreeMap::new();
        assert_eq!(
            fingerprint("vpc-a", "", 2, &labels, &attrs),
            fingerprint("vpc-a", "", 2, &labels, &attrs)
        );
    }

    #[test]
    fn a_changed_attribute_changes_the_fingerprint() {
        let labels = BTreeMap::new();
        let mut attrs_a = BTreeMap::new();
        attrs_a.insert("cidr_block".to_string(), "10.0.0.0/24".to_string());
        let mut attrs_b = BTreeMap::new();
        attrs_b.insert("cidr_block".to_string(), "10.0.1.0/24".to_string());

        assert_ne!(
            fingerprint("vpc-a", "", 2, &labels, &attrs_a),
            fingerprint("vpc-a", "", 2, &labels, &attrs_b)
        );
    }

    #[test]
    fn label_order_does_not_affect_the_fingerprint() {
        let mut labels_a = BTreeMap::new();
        labels_a.insert("env".to_string(), "prod".to_string());
        labels_a.insert("owner".to_string(), "fleet".to_string());
        let labels_b: BTreeMap<String, String> = labels_a.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        let attrs = BTreeMap::new();

        assert_eq!(
            fingerprint("vpc-a", "", 2, &labels_a, &attrs),
            fingerprint("vpc-a", "", 2, &labels_b, &attrs)
        );
    }
}
