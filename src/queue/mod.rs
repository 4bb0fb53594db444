pub mod consumer;
pub mod dispatcher;
pub mod message;
pub mod producer;
pub mod routing;

pub use consumer::consume_once;
pub use dispatcher::{DispatchOutcome, Dispatcher};
pub use message::{IntegrationMessage, SubmissionEvent};
pub use routing::route;
