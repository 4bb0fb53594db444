pub mod engine;
pub mod manager;
pub mod params;
pub mod record;
pub mod retry;

pub use engine::{DeliveryWorkflow, STEP_DELIVER, STEP_FETCH_CONTEXT, STEP_FETCH_CREDENTIALS, STEP_TRANSFORM};
pub use manager::{FanOutReport, Manager};
pub use params::{instance_id, WorkflowParams, WorkflowSpec};
pub use record::{KeyedRecord, NO_VALUE};
pub use retry::RetryPolicy;
