use std::sync::Arc;

use crate::config::Config;
use crate::queue::Dispatcher;
use crate::store::{IntegrationQueue, IntegrationStore, WorkflowHost};
use crate::workflow::{DeliveryWorkflow, Manager};

pub type SharedState = Arc<AppState>;

pub struct AppState {
    pub queue: Arc<dyn IntegrationQueue>,
    pub config: Config,
    pub integrations: Arc<dyn IntegrationStore>,
    pub host: Arc<dyn WorkflowHost>,
    pub dispatcher: Dispatcher,
    pub manager: Manager,
    pub workflow: DeliveryWorkflow,
}
