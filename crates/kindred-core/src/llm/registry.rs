//! Task-to-model dispatch.
//!
//! Every model call names a [`TaskType`]. The registry resolves it in order:
//! 1. a per-session override for that task,
//! 2. a per-task override from configuration,
//! 3. the process default model.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use dashmap::DashMap;
use kindred_types::error::ConfigError;
use kindred_types::llm::TaskType;
use tracing::debug;

use super::box_client::BoxModelClient;

/// Name-indexed model clients plus task routing.
pub struct ModelRegistry {
    clients: HashMap<String, Arc<BoxModelClient>>,
    default_model: String,
    task_overrides: HashMap<TaskType, String>,
    session_overrides: DashMap<(String, TaskType), String>,
}

impl ModelRegistry {
    pub fn new(default_model: impl Into<String>) -> Self {
        Self {
            clients: HashMap::new(),
            default_model: default_model.into(),
            task_overrides: HashMap::new(),
            session_overrides: DashMap::new(),
        }
    }

    /// Register a client under the given name, replacing any previous one.
    pub fn register(&mut self, name: impl Into<String>, client: BoxModelClient) {
        self.clients.insert(name.into(), Arc::new(client));
    }

    pub fn set_task_override(&mut self, task: TaskType, model: impl Into<String>) {
        self.task_overrides.insert(task, model.into());
    }

    /// Apply `task name -> model name` pairs from configuration.
    pub fn apply_overrides(
        &mut self,
        overrides: &BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        for (task, model) in overrides {
            let task: TaskType = task.parse().map_err(ConfigError::Invalid)?;
            self.set_task_override(task, model.clone());
        }
        Ok(())
    }

    /// Check that the default and every override name a registered client.
    pub fn validate(&self) -> Result<(), ConfigError> {
        std::iter::once(&self.default_model)
            .chain(self.task_overrides.values())
            .try_for_each(|name| self.lookup(name).map(|_| ()))
    }

    pub fn default_model(&self) -> &str {
        &self.default_model
    }

    /// Client for a task, ignoring session overrides.
    pub fn get_model_for_task(&self, task: TaskType) -> Result<Arc<BoxModelClient>, ConfigError> {
        let name = self
            .task_overrides
            .get(&task)
            .unwrap_or(&self.default_model);
        self.lookup(name)
    }

    /// Client for a task within a session.
    pub fn get_model_for_session(
        &self,
        session_id: &str,
        task: TaskType,
    ) -> Result<Arc<BoxModelClient>, ConfigError> {
        let key = (session_id.to_string(), task);
        if let Some(name) = self.session_overrides.get(&key) {
            debug!(session_id, task = %task, model = name.as_str(), "using session model override");
            return self.lookup(&name);
        }
        self.get_model_for_task(task)
    }

    /// Route one task to a different model for the rest of a session.
    pub fn override_for_session(
        &self,
        session_id: &str,
        task: TaskType,
        model: &str,
    ) -> Result<(), ConfigError> {
        self.lookup(model)?;
        self.session_overrides
            .insert((session_id.to_string(), task), model.to_string());
        Ok(())
    }

    pub fn clear_session(&self, session_id: &str) {
        self.session_overrides.retain(|(sid, _), _| sid != session_id);
    }

    /// Registered model names, sorted.
    pub fn list_models(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.clients.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    fn lookup(&self, name: &str) -> Result<Arc<BoxModelClient>, ConfigError> {
        self.clients
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::UnknownModel(name.to_string()))
    }
}
