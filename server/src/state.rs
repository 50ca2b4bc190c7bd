use std::sync::Arc;

use tokio::sync::mpsc;

use switchboard_core::Config;
use switchboard_core::fanout::StreamFanout;
use switchboard_core::history::HistoryIndex;
use switchboard_core::permissions::PermissionBroker;
use switchboard_core::registry::SessionRegistry;
use switchboard_core::supervisor::ProcessSupervisor;
use switchboard_core::supervisor::SupervisorEvent;

/// The core components, shared by every handler and wiring task.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub supervisor: Arc<ProcessSupervisor>,
    pub registry: Arc<SessionRegistry>,
    pub fanout: Arc<StreamFanout>,
    pub broker: Arc<PermissionBroker>,
    pub history: Arc<HistoryIndex>,
}

impl AppState {
    /// Construct every component from one config. The returned receiver is
    /// the supervisor's event feed; hand it to the wiring pump.
    pub fn build(config: Arc<Config>) -> (Self, mpsc::Receiver<SupervisorEvent>) {
        let (supervisor, rx_event) = ProcessSupervisor::new(Arc::clone(&config));
        let fanout = StreamFanout::new(config.heartbeat_interval);
        let history = HistoryIndex::new(config.projects_dir());
        let state = Self {
            config,
            supervisor,
            registry: Arc::new(SessionRegistry::new()),
            fanout,
            broker: Arc::new(PermissionBroker::new()),
            history,
        };
        (state, rx_event)
    }
}
