use super::KnowledgeStore;
use crate::models::enums::DocumentType;
use crate::models::KnowledgeBaseExample;

/// Few-shot example lookup with graceful degradation.
///
/// Exact type+carrier matches come first; if they do not fill the limit, the
/// remainder is topped up with same-type examples from other carriers. A
/// store failure yields zero examples — extraction must never be blocked by
/// knowledge-base unavailability.
pub struct ExampleRetriever<'a> {
    store: &'a dyn KnowledgeStore,
}

impl<'a> ExampleRetriever<'a> {
    pub fn new(store: &'a dyn KnowledgeStore) -> Self {
        Self { store }
    }

    pub fn retrieve(
        &self,
        document_type: DocumentType,
        carrier: &str,
        limit: usize,
    ) -> Vec<KnowledgeBaseExample> {
        if limit == 0 {
            return Vec::new();
        }

        let mut examples = match self.store.query(document_type, carrier, limit) {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(
                    document_type = document_type.as_str(),
                    carrier,
                    error = %e,
                    "Knowledge store unreachable — extracting zero-shot"
                );
                return Vec::new();
            }
        };

        if examples.len() < limit && !carrier.is_empty() {
            match self.store.query(document_type, "", limit) {
                Ok(fallback) => {
                    for example in fallback {
                        if examples.len() >= limit {
                            break;
                        }
                        if !examples.iter().any(|e| e.id == example.id) {
                            examples.push(example);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Carrier-fallback query failed — keeping exact matches");
                }
            }
        }

        examples.truncate(limit);
        examples
    }
}
