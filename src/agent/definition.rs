// ABOUTME: Agent descriptors - the immutable identity and capability set of an agent.
// ABOUTME: AgentRoster holds registered agents in registration order.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::CapabilityAgent;
use crate::error::RegistryError;

/// Identity, domain and allowed tools of one capability agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentDescriptor {
    pub agent_id: String,

    /// Human-readable domain, e.g. "cloud resources".
    pub domain_label: String,

    /// Tools this agent may propose. Anything else is a capability violation.
    pub tool_names: BTreeSet<String>,

    /// Lower-case routing keywords used by speaker selection.
    pub keywords: Vec<String>,

    pub system_prompt: String,
}

impl AgentDescriptor {
    pub fn new(agent_id: impl Into<String>, domain_label: impl Into<String>) -> Self {
        Self {
            agent_id: agent_id.into(),
            domain_label: domain_label.into(),
            tool_names: BTreeSet::new(),
            keywords: Vec::new(),
            system_prompt: String::new(),
        }
    }

    pub fn tools<I, S>(mut self, tools: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tool_names.extend(tools.into_iter().map(Into::into));
        self
    }

    pub fn keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords
            .extend(keywords.into_iter().map(|k| k.into().to_lowercase()));
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Whether `tool_name` is in this agent's declared set.
    pub fn allows(&self, tool_name: &str) -> bool {
        self.tool_names.contains(tool_name)
    }
}

/// Agents available to a Manager, fixed at startup.
///
/// Order of registration is the tie-breaker for speaker selection.
#[derive(Clone, Default)]
pub struct AgentRoster {
    agents: Vec<Arc<CapabilityAgent>>,
}

impl AgentRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent. Its declared tools must all exist in its registry.
    pub fn register(&mut self, agent: CapabilityAgent) -> Result<(), RegistryError> {
        let descriptor = agent.descriptor();
        if self.get(&descriptor.agent_id).is_some() {
            return Err(RegistryError::DuplicateAgent(descriptor.agent_id.clone()));
        }
        if let Some(missing) = descriptor
            .tool_names
            .iter()
            .find(|name| !agent.registry().contains(name))
        {
            return Err(RegistryError::UnknownTool {
                agent_id: descriptor.agent_id.clone(),
                tool_name: missing.clone(),
            });
        }
        tracing::debug!(agent_id = %descriptor.agent_id, tools = descriptor.tool_names.len(), "registered agent");
        self.agents.push(Arc::new(agent));
        Ok(())
    }

    /// Builder form of `register`.
    pub fn with(mut self, agent: CapabilityAgent) -> Result<Self, RegistryError> {
        self.register(agent)?;
        Ok(self)
    }

    pub fn get(&self, agent_id: &str) -> Option<&Arc<CapabilityAgent>> {
        self.agents.iter().find(|a| a.descriptor().agent_id == agent_id)
    }

    /// Descriptors in registration order.
    pub fn descriptors(&self) -> Vec<&AgentDescriptor> {
        self.agents.iter().map(|a| a.descriptor()).collect()
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_descriptor_builder() {
        let desc = AgentDescriptor::new("azure_agent", "cloud resources")
            .tools(["list_vms", "cleanup_old_vms"])
            .keywords(["VM", "Azure"])
            .system_prompt("You manage Azure.");

        assert_eq!(desc.agent_id, "azure_agent");
        assert!(desc.allows("list_vms"));
        assert!(!desc.allows("read_file"));
        assert_eq!(desc.keywords, vec!["vm", "azure"]);
        assert_eq!(desc.system_prompt, "You manage Azure.");
    }
}
