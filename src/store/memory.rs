//! Rule storage

use crate::error::StoreError;
use crate::rule::AstNode;
use crate::store::rule::{Rule, RuleId};
use ahash::AHashMap;
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Persistence seam for rules
///
/// Implementations hand out `Arc<Rule>` snapshots: a reader holds either the
/// rule before a `replace` or after it, never a mix.
pub trait RuleStore: Send + Sync {
    /// Store a new rule under a fresh id
    fn insert(&self, source_text: String, ast: Arc<AstNode>) -> Arc<Rule>;

    fn get(&self, id: RuleId) -> Option<Arc<Rule>>;

    /// Swap text and tree of an existing rule in one step
    fn replace(
        &self,
        id: RuleId,
        source_text: String,
        ast: Arc<AstNode>,
    ) -> Result<Arc<Rule>, StoreError>;

    fn remove(&self, id: RuleId) -> Result<Arc<Rule>, StoreError>;

    /// All rules, ascending by id
    fn list(&self) -> Vec<Arc<Rule>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process rule store
pub struct MemoryRuleStore {
    rules: RwLock<AHashMap<RuleId, Arc<Rule>>>,
    next_id: AtomicU64,
}

impl MemoryRuleStore {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(AHashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }
}

impl Default for MemoryRuleStore {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleStore for MemoryRuleStore {
    #[instrument(skip(self, ast))]
    fn insert(&self, source_text: String, ast: Arc<AstNode>) -> Arc<Rule> {
        let id = RuleId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let rule = Arc::new(Rule::new(id, source_text, ast));
        self.rules.write().insert(id, Arc::clone(&rule));
        info!("rule stored: {}", id);
        rule
    }

    fn get(&self, id: RuleId) -> Option<Arc<Rule>> {
        self.rules.read().get(&id).cloned()
    }

    #[instrument(skip(self, ast))]
    fn replace(
        &self,
        id: RuleId,
        source_text: String,
        ast: Arc<AstNode>,
    ) -> Result<Arc<Rule>, StoreError> {
        let mut rules = self.rules.write();
        match rules.get_mut(&id) {
            Some(slot) => {
                let rule = Arc::new(Rule::new(id, source_text, ast));
                *slot = Arc::clone(&rule);
                info!("rule replaced: {}", id);
                Ok(rule)
            }
            None => {
                warn!("replace on unknown rule: {}", id);
                Err(StoreError::NotFound(id))
            }
        }
    }

    #[instrument(skip(self))]
    fn remove(&self, id: RuleId) -> Result<Arc<Rule>, StoreError> {
        match self.rules.write().remove(&id) {
            Some(rule) => {
                info!("rule removed: {}", id);
                Ok(rule)
            }
            None => {
                warn!("remove on unknown rule: {}", id);
                Err(StoreError::NotFound(id))
            }
        }
    }

    fn list(&self) -> Vec<Arc<Rule>> {
        let mut rules: Vec<Arc<Rule>> = self.rules.read().values().cloned().collect();
        rules.sort_by_key(|r| r.id);
        rules
    }

    fn len(&self) -> usize {
        self.rules.read().len()
    }
}
