pub mod accounts;
pub mod form_fields;
pub mod integration_queue;
pub mod integrations;
pub mod workflow_instances;
pub mod workflow_steps;
