//! Built-in table of ports developers commonly care about.

use std::sync::OnceLock;

const WELL_KNOWN_PORTS: &[(u16, &str)] = &[
    (1433, "SQL Server"),
    (3000, "React / Next.js Dev Server"),
    (3001, "React Alt / Proxy"),
    (3306, "MySQL"),
    (4200, "Angular Dev Server"),
    (5000, "ASP.NET / Flask"),
    (5173, "Vite Dev Server"),
    (5174, "Vite Alt"),
    (5432, "PostgreSQL"),
    (5500, "Live Server (VS Code)"),
    (5672, "RabbitMQ"),
    (6379, "Redis"),
    (8000, "Django / PHP"),
    (8080, "HTTP Proxy / Tomcat"),
    (8081, "HTTP Alt"),
    (8443, "HTTPS Alt"),
    (8888, "Jupyter Notebook"),
    (9000, "PHP-FPM / SonarQube"),
    (9200, "Elasticsearch"),
    (27017, "MongoDB"),
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct CatalogEntry {
    pub port: u16,
    pub label: &'static str,
}

/// Read-only port -> description table, built once per process.
#[derive(Debug)]
pub struct PortCatalog {
    entries: Vec<CatalogEntry>,
}

impl PortCatalog {
    pub fn builtin() -> &'static PortCatalog {
        static CATALOG: OnceLock<PortCatalog> = OnceLock::new();
        CATALOG.get_or_init(|| PortCatalog::from_pairs(WELL_KNOWN_PORTS))
    }

    pub fn from_pairs(pairs: &[(u16, &'static str)]) -> Self {
        let entries = pairs
            .iter()
            .map(|&(port, label)| CatalogEntry { port, label })
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn label_for(&self, port: u16) -> Option<&'static str> {
        self.entries.iter().find(|e| e.port == port).map(|e| e.label)
    }
}
