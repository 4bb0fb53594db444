pub mod account;
pub mod form_field;
pub mod integration;
pub mod queue_item;
pub mod submission;
pub mod workflow_instance;

pub use account::{Credential, ProviderKind};
pub use form_field::FormField;
pub use integration::{Integration, IntegrationType, OwnerContact};
pub use queue_item::IntegrationQueueItem;
pub use submission::SubmissionValue;
pub use workflow_instance::{WorkflowInstance, WorkflowStatus};
