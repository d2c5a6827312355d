//! Action handlers: one per action kind, wired into the dispatcher.

pub mod base;
pub mod defer;
pub mod dispatcher;
pub mod forget;
pub mod memorize;
pub mod observe;
pub mod ponder;
pub mod recall;
pub mod reject;
pub mod speak;
pub mod task_complete;
pub mod tool;

use std::collections::HashMap;
use std::sync::Arc;

use crate::domain::models::ActionKind;
use crate::services::ponder::PonderManager;

pub use base::{ActionHandler, HandlerServices};
pub use defer::DeferHandler;
pub use dispatcher::ActionDispatcher;
pub use forget::ForgetHandler;
pub use memorize::MemorizeHandler;
pub use observe::ObserveHandler;
pub use ponder::PonderHandler;
pub use recall::RecallHandler;
pub use reject::RejectHandler;
pub use speak::SpeakHandler;
pub use task_complete::TaskCompleteHandler;
pub use tool::ToolHandler;

/// Instantiate every handler and return a ready dispatcher.
pub fn build_action_dispatcher(
    services: HandlerServices,
    ponder_manager: Arc<PonderManager>,
) -> ActionDispatcher {
    let mut handlers: HashMap<ActionKind, Arc<dyn ActionHandler>> = HashMap::new();
    handlers.insert(
        ActionKind::Observe,
        Arc::new(ObserveHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Speak,
        Arc::new(SpeakHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Tool,
        Arc::new(ToolHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Ponder,
        Arc::new(PonderHandler::new(services.clone(), ponder_manager)),
    );
    handlers.insert(
        ActionKind::Reject,
        Arc::new(RejectHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Defer,
        Arc::new(DeferHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Memorize,
        Arc::new(MemorizeHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Recall,
        Arc::new(RecallHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::Forget,
        Arc::new(ForgetHandler::new(services.clone())),
    );
    handlers.insert(
        ActionKind::TaskComplete,
        Arc::new(TaskCompleteHandler::new(services.clone())),
    );
    ActionDispatcher::new(handlers, services)
}
