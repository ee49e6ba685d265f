//! Rule parsing cache
//!
//! Parsed trees are immutable, so one `Arc` per distinct source text is
//! handed to every caller. Keys are user-supplied text, so the cache is
//! emptied once it holds `MAX_CACHE_ENTRIES` trees; callers keep their `Arc`s.

use crate::error::Result;
use crate::rule::ast::AstNode;
use crate::rule::parser;
use ahash::AHashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

/// Distinct rule texts held before the cache starts over
pub const MAX_CACHE_ENTRIES: usize = 4096;

/// Global rule cache keyed by source text
static RULE_CACHE: Lazy<RwLock<AHashMap<String, Arc<AstNode>>>> = Lazy::new(|| {
    let map = AHashMap::with_capacity(1024);
    RwLock::new(map)
});

/// Get or parse a rule string, using the cache for repeated text
#[inline]
pub fn get_or_parse(text: &str) -> Result<Arc<AstNode>> {
    // Fast path: check read lock first
    {
        let cache = RULE_CACHE.read();
        if let Some(ast) = cache.get(text) {
            return Ok(Arc::clone(ast));
        }
    }

    // Failed parses are not cached
    let ast = Arc::new(parser::parse(text)?);

    let mut cache = RULE_CACHE.write();
    if cache.len() >= MAX_CACHE_ENTRIES && !cache.contains_key(text) {
        debug!(entries = cache.len(), "rule cache full, clearing");
        cache.clear();
    }
    let entry = cache
        .entry(text.to_string())
        .or_insert_with(|| Arc::clone(&ast));
    Ok(Arc::clone(entry))
}

/// Clear the rule cache
pub fn clear_cache() {
    let mut cache = RULE_CACHE.write();
    cache.clear();
}

/// Number of cached trees
pub fn cache_size() -> usize {
    let cache = RULE_CACHE.read();
    cache.len()
}
