//! Convenience re-exports for common use.

pub use crate::config::{EruditeConfig, KeyLookup, Settings};
pub use crate::error::{EruditeError, Result};
pub use crate::generation::{collect_fragments, FragmentStream, GenerationTransport, Generator};
pub use crate::models::{ModelSelector, ProviderKey};
pub use crate::prompts::{Language, PromptLibrary, TemplateType};
pub use crate::sources::{AbstractSource, FileSource, PaperSource, PastedSource};
pub use crate::types::{
    ChatMessage, ChatRole, GenerationRequest, Note, PaperMetadata, ProgressStep, SamplingConfig,
    SearchResult, SearchSource, StepStatus,
};
pub use crate::workflow::{GenerationMode, WorkflowEvent, WorkflowRequest, Workspace};
pub use tokio_util::sync::CancellationToken;
