//! Ledger namespace definitions.
//!
//! Every key lives in exactly one namespace. The main world state is
//! [`NS_STATE`]; each private data collection gets its own namespace named
//! `private:<collection>`.

/// Main (public, committed) world state
pub const NS_STATE: &str = "state";

/// Prefix for private data collection namespaces
pub const PRIVATE_NS_PREFIX: &str = "private:";

/// Namespace holding a private data collection
pub fn private_namespace(collection: &str) -> String {
    format!("{}{}", PRIVATE_NS_PREFIX, collection)
}

/// Get all namespace names for the given private collections
pub fn all_namespaces(collections: &[&str]) -> Vec<String> {
    let mut namespaces = vec![NS_STATE.to_string()];
    namespaces.extend(collections.iter().map(|c| private_namespace(c)));
    namespaces
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_private_namespace() {
        assert_eq!(private_namespace("kiesnet-id"), "private:kiesnet-id");
    }

    #[test]
    fn test_no_duplicate_namespaces() {
        let namespaces = all_namespaces(&["a", "b"]);
        let mut unique = std::collections::HashSet::new();

        for ns in &namespaces {
            assert!(unique.insert(ns), "Duplicate namespace: {}", ns);
        }
        assert_eq!(namespaces.len(), 3);
    }
}
