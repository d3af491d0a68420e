//! Cache key namespacing. Every key the crate touches is built here so the
//! on-wire key family stays consistent across snapshot, geo, and
//! participants storage.

use bundl_types::OrderId;

/// Builds namespaced Redis keys under a configured prefix.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self { prefix: prefix.into() }
    }

    /// `{prefix}:order:{id}` — the serialized order snapshot, TTL-bearing.
    #[must_use]
    pub fn snapshot(&self, order_id: OrderId) -> String {
        format!("{}:order:{}", self.prefix, order_id.as_key_fragment())
    }

    /// `{prefix}:order:{id}:participants` — set of user ids who ever pledged.
    #[must_use]
    pub fn participants(&self, order_id: OrderId) -> String {
        format!("{}:order:{}:participants", self.prefix, order_id.as_key_fragment())
    }

    /// `{prefix}:orders:geo` — the shared geo-indexed set.
    #[must_use]
    pub fn geo_index(&self) -> String {
        format!("{}:orders:geo", self.prefix)
    }

    /// The `order:{id}` member value stored inside the geo-index — distinct
    /// from [`KeySpace::snapshot`] because the geo set holds members, not
    /// namespaced keys of their own.
    #[must_use]
    pub fn geo_member(&self, order_id: OrderId) -> String {
        format!("order:{}", order_id.as_key_fragment())
    }

    /// Parses a `{prefix}:order:{id}` key (as delivered by a
    /// keyspace-notification payload) back into an [`OrderId`]. Returns
    /// `None` for keys that don't match the snapshot pattern (e.g. the
    /// participants set also expires and shares the same TTL).
    #[must_use]
    pub fn parse_snapshot_key(&self, key: &str) -> Option<OrderId> {
        let rest = key.strip_prefix(&format!("{}:order:", self.prefix))?;
        if rest.contains(':') {
            return None; // participants key, not a snapshot key
        }
        rest.parse().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_and_participants_keys_are_distinct() {
        let ks = KeySpace::new("bundl");
        let id = OrderId::new();
        assert_ne!(ks.snapshot(id), ks.participants(id));
        assert!(ks.participants(id).ends_with(":participants"));
    }

    #[test]
    fn parse_snapshot_key_roundtrips() {
        let ks = KeySpace::new("bundl");
        let id = OrderId::new();
        let key = ks.snapshot(id);
        assert_eq!(ks.parse_snapshot_key(&key), Some(id));
    }

    #[test]
    fn parse_snapshot_key_rejects_participants_key() {
        let ks = KeySpace::new("bundl");
        let id = OrderId::new();
        let key = ks.participants(id);
        assert_eq!(ks.parse_snapshot_key(&key), None);
    }

    #[test]
    fn parse_snapshot_key_rejects_foreign_prefix() {
        let ks = KeySpace::new("bundl");
        assert_eq!(ks.parse_snapshot_key("other:order:abc"), None);
    }
}
