//! Ports - traits for the collaborators the processor depends on.
//!
//! The document store, the prompt formatter and the hosted model live outside
//! this crate; `impls` has in-memory and HTTP implementations.

pub mod generative;
pub mod prompt;
pub mod store;

pub use self::generative::{
    Candidate, CandidateContent, Content, GenerateContentRequest, GenerateContentResponse,
    GenerativeModel, ModelError, Part, Role,
};
pub use self::prompt::PromptFormatter;
pub use self::store::{CommentStore, ProjectStore, ReportStore, StoreError};
