//! The policy store.
//!
//! `PolicyStore` owns every loaded `Policy` and the 1:1 table binding agents
//! to policies. Policies are handed out as `Arc<Policy>`: a replacement swaps
//! the `Arc` under a write lock, so a reader either sees the old version or
//! the new one, and keeps whichever it resolved until its request completes.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::{debug, info};

use tollgate_contracts::{
    error::{TollgateError, TollgateResult},
    policy::Policy,
    principal::{AgentId, Principal},
};
use tollgate_core::{config::TollgateConfig, traits::PolicyResolver};

use crate::document::PolicyDocument;

/// Loaded policies plus agent bindings.
///
/// ```rust,ignore
/// use tollgate_policy::PolicyStore;
///
/// let store = PolicyStore::new();
/// store.load_file(Path::new("policies/customer-support.toml"))?;
/// store.bind("customer_support_agent", "customer-support-v1")?;
/// ```
#[derive(Debug, Default)]
pub struct PolicyStore {
    policies: RwLock<HashMap<String, Arc<Policy>>>,
    bindings: RwLock<HashMap<AgentId, String>>,
}

impl PolicyStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from the configured policy files and bindings.
    ///
    /// Fails if any file is invalid, two files share a `policy_id`, or a
    /// binding names a policy that was not loaded.
    pub fn from_config(config: &TollgateConfig) -> TollgateResult<Self> {
        let store = Self::new();
        let mut documents = Vec::with_capacity(config.policy_files.len());
        for path in &config.policy_files {
            documents.push(read_document(path)?);
        }
        store.load_documents(documents)?;
        for binding in &config.bindings {
            store.bind(&binding.agent_id, &binding.policy_id)?;
        }
        Ok(store)
    }

    /// Validate and add one policy. An id that is already loaded is rejected;
    /// use [`replace`](Self::replace) to update an existing policy.
    pub fn insert(&self, document: PolicyDocument) -> TollgateResult<Arc<Policy>> {
        self.insert_policy(document.into_policy()?)
    }

    /// Parse and add a policy from TOML text.
    pub fn load_toml_str(&self, s: &str) -> TollgateResult<Arc<Policy>> {
        self.insert(PolicyDocument::from_toml_str(s)?)
    }

    /// Read, parse, and add a policy file.
    pub fn load_file(&self, path: &Path) -> TollgateResult<Arc<Policy>> {
        self.insert(read_document(path)?)
    }

    /// Load every `*.toml` file in `dir` as one batch, in file-name order.
    ///
    /// The batch is validated as a whole before anything is inserted.
    pub fn load_dir(&self, dir: &Path) -> TollgateResult<Vec<Arc<Policy>>> {
        let entries = fs::read_dir(dir).map_err(|e| TollgateError::ConfigError {
            reason: format!("failed to read policy directory '{}': {e}", dir.display()),
        })?;
        let mut paths = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| TollgateError::ConfigError {
                reason: format!("failed to read policy directory '{}': {e}", dir.display()),
            })?;
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        let mut documents = Vec::with_capacity(paths.len());
        for path in &paths {
            documents.push(read_document(path)?);
        }
        self.load_documents(documents)
    }

    fn load_documents(&self, documents: Vec<PolicyDocument>) -> TollgateResult<Vec<Arc<Policy>>> {
        let mut seen = HashSet::new();
        let mut validated = Vec::with_capacity(documents.len());
        for document in documents {
            if !seen.insert(document.policy_id.clone()) {
                return Err(TollgateError::PolicyInvalid {
                    policy_id: document.policy_id,
                    reason: "duplicate policy_id in one load".to_string(),
                });
            }
            validated.push(document.into_policy()?);
        }
        // Nothing is inserted until the whole batch validated.
        validated
            .into_iter()
            .map(|policy| self.insert_policy(policy))
            .collect()
    }

    fn insert_policy(&self, policy: Policy) -> TollgateResult<Arc<Policy>> {
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        if policies.contains_key(&policy.policy_id) {
            return Err(TollgateError::PolicyInvalid {
                policy_id: policy.policy_id,
                reason: "a policy with this id is already loaded".to_string(),
            });
        }
        info!(
            policy_id = %policy.policy_id,
            version = policy.version,
            allowed = policy.allowed_actions.len(),
            blocked = policy.blocked_actions.len(),
            "policy loaded"
        );
        let policy = Arc::new(policy);
        policies.insert(policy.policy_id.clone(), Arc::clone(&policy));
        Ok(policy)
    }

    /// The currently loaded version of `policy_id`.
    pub fn load(&self, policy_id: &str) -> TollgateResult<Arc<Policy>> {
        self.policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(policy_id)
            .cloned()
            .ok_or_else(|| TollgateError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            })
    }

    /// Atomically swap in a new version of an already-loaded policy.
    ///
    /// Readers holding the previous `Arc` are unaffected.
    pub fn replace(&self, document: PolicyDocument) -> TollgateResult<Arc<Policy>> {
        let policy = Arc::new(document.into_policy()?);
        let mut policies = self.policies.write().unwrap_or_else(PoisonError::into_inner);
        let Some(previous) = policies.get(&policy.policy_id) else {
            return Err(TollgateError::PolicyNotFound {
                policy_id: policy.policy_id.clone(),
            });
        };
        info!(
            policy_id = %policy.policy_id,
            from_version = previous.version,
            to_version = policy.version,
            "policy replaced"
        );
        policies.insert(policy.policy_id.clone(), Arc::clone(&policy));
        Ok(policy)
    }

    /// Bind `agent_id` to a loaded policy.
    pub fn bind(&self, agent_id: &str, policy_id: &str) -> TollgateResult<()> {
        if !self
            .policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(policy_id)
        {
            return Err(TollgateError::PolicyNotFound {
                policy_id: policy_id.to_string(),
            });
        }
        debug!(agent_id = %agent_id, policy_id = %policy_id, "agent bound to policy");
        self.bindings
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(AgentId::new(agent_id), policy_id.to_string());
        Ok(())
    }

    /// Ids of all loaded policies, sorted.
    pub fn policy_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .policies
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}

impl PolicyResolver for PolicyStore {
    fn resolve(&self, principal: &Principal) -> TollgateResult<Arc<Policy>> {
        let policy_id = self
            .bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&principal.agent_id)
            .cloned()
            .ok_or_else(|| TollgateError::PolicyNotFound {
                policy_id: format!("<unbound agent '{}'>", principal.agent_id),
            })?;
        self.load(&policy_id)
    }
}

fn read_document(path: &Path) -> TollgateResult<PolicyDocument> {
    let contents = fs::read_to_string(path).map_err(|e| TollgateError::ConfigError {
        reason: format!("failed to read policy file '{}': {e}", path.display()),
    })?;
    PolicyDocument::from_toml_str(&contents)
}
