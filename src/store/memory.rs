use std::collections::HashMap;
use std::sync::RwLock;

use crate::cookie::Cookie;
use crate::domain::permute_domain;
use crate::path::path_match;
use crate::store::{CookieStore, StoreError};

/// domain → path → key, one record per tuple.
type DomainIndex = HashMap<String, HashMap<String, HashMap<String, Cookie>>>;

/// Reference in-memory store.
///
/// Lookups probe the candidate domains produced by
/// [`permute_domain`]; within each domain either every path (request path
/// `None`) or every path-matching path accepts. Never errors.
#[derive(Debug, Default)]
pub struct MemoryCookieStore {
    idx: RwLock<DomainIndex>,
}

impl MemoryCookieStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl CookieStore for MemoryCookieStore {
    fn find_cookie(
        &self,
        domain: &str,
        path: &str,
        key: &str,
    ) -> Result<Option<Cookie>, StoreError> {
        let idx = self.idx.read().unwrap();
        Ok(idx
            .get(domain)
            .and_then(|paths| paths.get(path))
            .and_then(|keys| keys.get(key))
            .cloned())
    }

    fn find_cookies(&self, domain: &str, path: Option<&str>) -> Result<Vec<Cookie>, StoreError> {
        let mut results = Vec::new();
        if domain.is_empty() {
            return Ok(results);
        }

        // Domains above the registrable one cannot hold cookies anyway, so
        // probing the permutations is equivalent to a domain-match scan.
        let domains = match permute_domain(domain) {
            Some(domains) => domains,
            None => vec![domain.to_owned()],
        };

        let idx = self.idx.read().unwrap();
        for current in &domains {
            let paths = match idx.get(current) {
                Some(paths) => paths,
                None => continue,
            };
            match path {
                None => {
                    for keys in paths.values() {
                        results.extend(keys.values().cloned());
                    }
                }
                Some(req_path) => {
                    for (stored_path, keys) in paths {
                        if path_match(req_path, stored_path) {
                            results.extend(keys.values().cloned());
                        }
                    }
                }
            }
        }
        Ok(results)
    }

    fn put_cookie(&self, cookie: Cookie) -> Result<(), StoreError> {
        let domain = cookie.domain.clone().unwrap_or_default();
        let path = cookie.path.clone().unwrap_or_default();
        let key = cookie.key.clone();
        let mut idx = self.idx.write().unwrap();
        idx.entry(domain)
            .or_default()
            .entry(path)
            .or_default()
            .insert(key, cookie);
        Ok(())
    }

    fn remove_cookie(&self, domain: &str, path: &str, key: &str) -> Result<(), StoreError> {
        let mut idx = self.idx.write().unwrap();
        if let Some(paths) = idx.get_mut(domain) {
            if let Some(keys) = paths.get_mut(path) {
                keys.remove(key);
            }
        }
        Ok(())
    }

    fn remove_cookies(&self, domain: &str, path: Option<&str>) -> Result<(), StoreError> {
        let mut idx = self.idx.write().unwrap();
        match path {
            None => {
                idx.remove(domain);
            }
            Some(path) => {
                if let Some(paths) = idx.get_mut(domain) {
                    paths.remove(path);
                }
            }
        }
        Ok(())
    }

    fn all_cookies(&self) -> Result<Vec<Cookie>, StoreError> {
        let idx = self.idx.read().unwrap();
        let mut cookies: Vec<Cookie> = idx
            .values()
            .flat_map(|paths| paths.values())
            .flat_map(|keys| keys.values().cloned())
            .collect();
        cookies.sort_by_key(|cookie| cookie.creation_index);
        Ok(cookies)
    }

    fn store_type(&self) -> &'static str {
        "MemoryCookieStore"
    }
}
