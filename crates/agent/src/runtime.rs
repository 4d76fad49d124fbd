//! Question-answering runtime: routing, tool registry assembly, and
//! delegation to the model seam.

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use salescope_core::profile::{AgentProfile, ProfileRouter};

use crate::calendar::{CalendarClient, CreateCalendarEventTool, ListUpcomingEventsTool};
use crate::gateway::QueryGateway;
use crate::llm::LlmClient;
use crate::tools::{ToolRegistry, WarehouseQueryTool};

pub struct AgentRuntime {
    router: ProfileRouter,
    llm: Arc<dyn LlmClient>,
    gateway: Arc<QueryGateway>,
    calendar: Option<Arc<dyn CalendarClient>>,
    calendar_window_days: u32,
    calendar_max_events: usize,
}

impl AgentRuntime {
    pub fn new(
        router: ProfileRouter,
        llm: Arc<dyn LlmClient>,
        gateway: Arc<QueryGateway>,
        calendar: Option<Arc<dyn CalendarClient>>,
        calendar_window_days: u32,
        calendar_max_events: usize,
    ) -> Self {
        Self { router, llm, gateway, calendar, calendar_window_days, calendar_max_events }
    }

    /// The warehouse query tool is always present; calendar tools only when
    /// the routed profile enables them and a client is configured.
    fn registry_for(&self, profile: &AgentProfile) -> ToolRegistry {
        let mut registry = ToolRegistry::default();
        registry.register(WarehouseQueryTool::new(self.gateway.clone()));

        if profile.calendar_enabled {
            if let Some(calendar) = &self.calendar {
                registry.register(ListUpcomingEventsTool::new(
                    calendar.clone(),
                    self.calendar_window_days,
                    self.calendar_max_events,
                ));
                registry.register(CreateCalendarEventTool::new(calendar.clone()));
            }
        }

        registry
    }

    pub async fn answer(&self, question: &str) -> Result<String> {
        let profile = self.router.route(question);
        let registry = self.registry_for(profile);

        info!(
            event_name = "agent.runtime.routed",
            profile = %profile.name,
            tools = registry.len()
        );

        self.llm.answer(&profile.instruction(), question, &registry).await
    }
}
