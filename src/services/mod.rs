//! Service layer: the confirmation-loop engine, agents, orchestration,
//! scheduling, review queue, and schema cleanup.

pub mod agents;
pub mod bootstrap;
pub mod confirmation_loop;
pub mod events;
pub mod logger;
pub mod maintenance;
pub mod pipeline;
pub mod review_service;
pub mod scheduler;
pub mod settings_service;
pub mod templates;
pub mod tools;

pub use agents::AgentDeps;
pub use bootstrap::{BootstrapAnalyzer, BootstrapProgress, BootstrapScope, JobStatus};
pub use confirmation_loop::{ConfirmationEngine, LoopConfig, LoopOutcome};
pub use events::{PipelineEvent, PipelineEventType};
pub use logger::ProcessingLogger;
pub use pipeline::{DocumentProcessor, Pipeline, PipelineOutcome};
pub use review_service::{ApproveOutcome, RejectionFeedback, ReviewService};
pub use scheduler::{AutoProcessor, ProcessorFactory, SchedulerStatus};
pub use settings_service::SettingsService;
pub use templates::TemplateStore;
pub use tools::ToolRegistry;
