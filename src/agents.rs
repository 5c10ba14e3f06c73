use crate::agent::{AgentTrait, AgentTruthful};
use crate::agent_balanced::AgentBalancedBidding;

/// Bidding strategy used when adding an agent
#[allow(non_camel_case_types)]
#[derive(Debug, Clone, PartialEq)]
pub enum AgentType {
    TRUTHFUL,
    BALANCED_BIDDING,
}

/// Container for agents
/// Agent IDs always match the index in the `agents` vector
pub struct Agents {
    pub agents: Vec<Box<dyn AgentTrait>>,
}

impl Agents {
    pub fn new() -> Self {
        Self {
            agents: Vec::new(),
        }
    }

    /// Add an agent to the collection
    ///
    /// # Arguments
    /// * `agent_name` - Name of the agent
    /// * `agent_type` - Bidding strategy
    /// * `value` - Private value per click
    /// * `budget` - Total spend allowed over the whole simulation
    ///
    /// # Returns
    /// The agent_id of the just added agent
    pub fn add(&mut self, agent_name: String, agent_type: AgentType, value: f64, budget: f64) -> usize {
        let agent_id = self.agents.len();
        let agent: Box<dyn AgentTrait> = match agent_type {
            AgentType::TRUTHFUL => Box::new(AgentTruthful {
                agent_id,
                agent_name,
                value,
                budget,
            }),
            AgentType::BALANCED_BIDDING => Box::new(AgentBalancedBidding {
                agent_id,
                agent_name,
                value,
                budget,
            }),
        };
        self.agents.push(agent);
        agent_id
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

impl Default for Agents {
    fn default() -> Self {
        Self::new()
    }
}
