mod messages;
mod metering;
mod orchestrator;

pub use messages::{channel, SessionHandle, SessionMessage, SessionStatus};
pub use orchestrator::{Flow, SessionDeps, SessionOrchestrator};
