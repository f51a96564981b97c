/// Common key-construction helpers for the Redis-backed store.
#[derive(Debug, Clone)]
pub struct KeyContext<'a> {
    pub prefix: &'a str,
    pub service: &'a str,
}

impl<'a> KeyContext<'a> {
    pub fn new(prefix: &'a str, service: &'a str) -> Self {
        Self { prefix, service }
    }

    pub fn document(&self, collection: &str, document_id: &str) -> String {
        format!("{}:{}:{}:{}", self.prefix, self.service, collection, document_id)
    }

    /// SCAN pattern matching every document of a collection.
    pub fn collection_pattern(&self, collection: &str) -> String {
        format!("{}:{}:{}:*", self.prefix, self.service, collection)
    }

    /// Strips the collection prefix from a full document key.
    pub fn document_id<'k>(&self, collection: &str, key: &'k str) -> Option<&'k str> {
        let head = format!("{}:{}:{}:", self.prefix, self.service, collection);
        key.strip_prefix(head.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_document_keys() {
        let ctx = KeyContext::new("syncodex", "social");
        assert_eq!(ctx.document("users", "abc"), "syncodex:social:users:abc");
        assert_eq!(ctx.collection_pattern("follows"), "syncodex:social:follows:*");
    }

    #[test]
    fn recovers_document_id_from_key() {
        let ctx = KeyContext::new("syncodex", "social");
        assert_eq!(ctx.document_id("follows", "syncodex:social:follows:u2.u1"), Some("u2.u1"));
        assert_eq!(ctx.document_id("users", "syncodex:social:follows:u2.u1"), None);
    }
}
