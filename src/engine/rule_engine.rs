//! Main rule engine

use crate::combiner::{combine_with, CombineStrategy};
use crate::config::EngineConfig;
use crate::error::{Result, StoreError};
use crate::evaluator::{evaluate_with, Record};
use crate::rule::{get_or_parse, AstNode};
use crate::store::{MemoryRuleStore, Rule, RuleId, RuleStore};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Rule engine facade
///
/// Parses rule text on the way into the store, resolves ids for combining
/// and evaluation, and applies the configured strategy and evaluation
/// options. Cheap to share across threads.
pub struct RuleEngine {
    config: EngineConfig,
    store: Arc<dyn RuleStore>,
}

impl RuleEngine {
    /// Engine backed by an in-memory store
    pub fn new(config: EngineConfig) -> Self {
        Self::with_store(config, Arc::new(MemoryRuleStore::new()))
    }

    pub fn with_store(config: EngineConfig, store: Arc<dyn RuleStore>) -> Self {
        Self { config, store }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parse and store a new rule
    #[instrument(skip(self))]
    pub fn create_rule(&self, text: &str) -> Result<Arc<Rule>> {
        let ast = get_or_parse(text)?;
        let rule = self.store.insert(text.to_string(), ast);
        info!(rule_id = %rule.id, "rule created");
        Ok(rule)
    }

    pub fn get_rule(&self, id: RuleId) -> Result<Arc<Rule>> {
        self.store
            .get(id)
            .ok_or_else(|| StoreError::NotFound(id).into())
    }

    /// Replace the text of an existing rule
    ///
    /// The new text is parsed first; on a syntax error the stored rule is
    /// left untouched.
    #[instrument(skip(self))]
    pub fn modify_rule(&self, id: RuleId, text: &str) -> Result<Arc<Rule>> {
        let ast = get_or_parse(text)?;
        let rule = self.store.replace(id, text.to_string(), ast)?;
        info!(rule_id = %id, "rule modified");
        Ok(rule)
    }

    #[instrument(skip(self))]
    pub fn delete_rule(&self, id: RuleId) -> Result<()> {
        self.store.remove(id)?;
        Ok(())
    }

    pub fn list_rules(&self) -> Vec<Arc<Rule>> {
        self.store.list()
    }

    /// Combine stored rules in the order given
    #[instrument(skip(self))]
    pub fn combine_rules(
        &self,
        ids: &[RuleId],
        strategy: Option<CombineStrategy>,
    ) -> Result<Arc<AstNode>> {
        let asts = ids
            .iter()
            .map(|id| self.get_rule(*id).map(|rule| Arc::clone(&rule.ast)))
            .collect::<Result<Vec<_>>>()?;
        self.combine_asts(&asts, strategy)
    }

    /// Combine rule text, one rule per non-blank line
    pub fn combine_texts(
        &self,
        text: &str,
        strategy: Option<CombineStrategy>,
    ) -> Result<Arc<AstNode>> {
        let asts = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(get_or_parse)
            .collect::<Result<Vec<_>>>()?;
        self.combine_asts(&asts, strategy)
    }

    /// Combine stored rules and save the result as a new rule whose text is
    /// the canonical rendering of the combined tree
    pub fn save_combined(
        &self,
        ids: &[RuleId],
        strategy: Option<CombineStrategy>,
    ) -> Result<Arc<Rule>> {
        let combined = self.combine_rules(ids, strategy)?;
        let rule = self.store.insert(combined.to_string(), combined);
        info!(rule_id = %rule.id, sources = ids.len(), "combined rule saved");
        Ok(rule)
    }

    fn combine_asts(
        &self,
        asts: &[Arc<AstNode>],
        strategy: Option<CombineStrategy>,
    ) -> Result<Arc<AstNode>> {
        let strategy = strategy.unwrap_or(self.config.default_strategy);
        Ok(combine_with(asts, strategy, self.config.combine_options())?)
    }

    /// Evaluate a stored rule against a record
    pub fn evaluate_rule(&self, id: RuleId, record: &Record) -> Result<bool> {
        let rule = self.get_rule(id)?;
        let result = self.evaluate_ast(&rule.ast, record);
        if let Err(e) = &result {
            warn!(rule_id = %id, error = %e, "evaluation failed");
        }
        result
    }

    /// Evaluate a stored rule against a JSON object record
    pub fn evaluate_rule_json(&self, id: RuleId, json: &str) -> Result<bool> {
        let record = Record::from_json(json)?;
        self.evaluate_rule(id, &record)
    }

    /// Evaluate rule text without storing it
    pub fn evaluate_text(&self, text: &str, record: &Record) -> Result<bool> {
        let ast = get_or_parse(text)?;
        self.evaluate_ast(&ast, record)
    }

    pub fn evaluate_ast(&self, ast: &AstNode, record: &Record) -> Result<bool> {
        let result = evaluate_with(ast, record, &self.config.eval_options())?;
        debug!(result, "evaluated rule");
        Ok(result)
    }

    /// Attribute names a stored rule reads, in first-occurrence order
    pub fn required_attributes(&self, id: RuleId) -> Result<Vec<String>> {
        let rule = self.get_rule(id)?;
        let names = rule.ast.attributes();
        Ok(names.iter().map(|name| name.to_string()).collect())
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
