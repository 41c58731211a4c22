use std::sync::{Arc, RwLock};

use thiserror::Error;

use crate::catalog::PortCatalog;
use crate::model::PortEntry;

const DEFAULT_CUSTOM_LABEL: &str = "Custom";

pub type SharedRegistry = Arc<RwLock<PortRegistry>>;

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum RegistryError {
    #[error("port {0} is outside 1-65535")]
    InvalidPort(u32),
    #[error("port {0} is already registered")]
    DuplicatePort(u16),
}

/// Ordered set of watched ports. Port numbers are unique and the list is
/// always sorted ascending.
#[derive(Clone, Debug, Default)]
pub struct PortRegistry {
    entries: Vec<PortEntry>,
}

impl PortRegistry {
    pub fn initialize(catalog: &PortCatalog) -> Self {
        let mut entries: Vec<PortEntry> = Vec::with_capacity(catalog.entries().len());
        for item in catalog.entries() {
            if entries.iter().any(|e| e.port == item.port) {
                continue;
            }
            entries.push(PortEntry {
                port: item.port,
                label: item.label.to_string(),
                is_custom: false,
            });
        }
        entries.sort_by_key(|e| e.port);
        Self { entries }
    }

    pub fn into_shared(self) -> SharedRegistry {
        Arc::new(RwLock::new(self))
    }

    pub fn add(&mut self, port: u32, label: &str) -> Result<(), RegistryError> {
        let port = match u16::try_from(port) {
            Ok(p) if p != 0 => p,
            _ => return Err(RegistryError::InvalidPort(port)),
        };

        let idx = match self.entries.binary_search_by_key(&port, |e| e.port) {
            Ok(_) => return Err(RegistryError::DuplicatePort(port)),
            Err(idx) => idx,
        };

        let label = label.trim();
        let label = if label.is_empty() {
            DEFAULT_CUSTOM_LABEL
        } else {
            label
        };
        self.entries.insert(
            idx,
            PortEntry {
                port,
                label: label.to_string(),
                is_custom: true,
            },
        );
        log::debug!("Registered custom port {} ({})", port, label);
        Ok(())
    }

    pub fn list(&self) -> &[PortEntry] {
        &self.entries
    }

    pub fn contains(&self, port: u16) -> bool {
        self.entries.binary_search_by_key(&port, |e| e.port).is_ok()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty() -> PortRegistry {
        PortRegistry::initialize(&PortCatalog::from_pairs(&[]))
    }

    #[test]
    fn initialize_sorts_catalog_and_marks_builtin() {
        let catalog = PortCatalog::from_pairs(&[(8080, "b"), (80, "a"), (443, "c")]);
        let registry = PortRegistry::initialize(&catalog);
        let ports: Vec<u16> = registry.list().iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![80, 443, 8080]);
        assert!(registry.list().iter().all(|e| !e.is_custom));
    }

    #[test]
    fn rejects_out_of_range_ports() {
        let mut registry = empty();
        assert_eq!(registry.add(0, "x"), Err(RegistryError::InvalidPort(0)));
        assert_eq!(
            registry.add(65536, "x"),
            Err(RegistryError::InvalidPort(65536))
        );
        assert!(registry.is_empty());
        assert!(registry.add(65535, "top").is_ok());
        assert!(registry.add(1, "bottom").is_ok());
    }

    #[test]
    fn duplicate_leaves_first_entry() {
        let mut registry = empty();
        registry.add(8080, "x").unwrap();
        assert_eq!(
            registry.add(8080, "y"),
            Err(RegistryError::DuplicatePort(8080))
        );
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.list()[0].label, "x");
        assert!(registry.list()[0].is_custom);
    }

    #[test]
    fn duplicate_of_catalog_port_fails() {
        let mut registry = PortRegistry::initialize(PortCatalog::builtin());
        let before = registry.list().to_vec();
        assert_eq!(
            registry.add(5432, "mine"),
            Err(RegistryError::DuplicatePort(5432))
        );
        assert_eq!(registry.list(), before.as_slice());
    }

    #[test]
    fn custom_ports_keep_ascending_order() {
        let mut registry = PortRegistry::initialize(&PortCatalog::from_pairs(&[(3000, "dev")]));
        registry.add(9999, "late").unwrap();
        registry.add(22, "ssh").unwrap();
        let ports: Vec<u16> = registry.list().iter().map(|e| e.port).collect();
        assert_eq!(ports, vec![22, 3000, 9999]);
        assert!(registry.contains(22));
    }

    #[test]
    fn blank_label_becomes_custom() {
        let mut registry = empty();
        registry.add(7000, "   ").unwrap();
        registry.add(7001, "  api  ").unwrap();
        assert_eq!(registry.list()[0].label, "Custom");
        assert_eq!(registry.list()[1].label, "api");
    }
}
