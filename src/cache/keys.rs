//! Cache key naming.
//!
//! Every key the coordinator touches is built here so the scheme stays in
//! one place:
//!
//! - `<ns>:all` holds the whole collection
//! - `<ns>:<id>` holds one product (value layout)
//! - `<ns>:ids` is the hash of per-id fields (hash layout)

/// Key builder for one namespace.
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(namespace: &str) -> Self {
        Self {
            prefix: format!("{namespace}:"),
        }
    }

    /// Prefix shared by every key in the namespace, including the separator.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn all(&self) -> String {
        format!("{}all", self.prefix)
    }

    pub fn by_id(&self, id: i64) -> String {
        format!("{}{id}", self.prefix)
    }

    pub fn id_hash(&self) -> String {
        format!("{}ids", self.prefix)
    }

    pub fn id_field(id: i64) -> String {
        id.to_string()
    }
}
