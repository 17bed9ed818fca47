//! Implementations of the ports.
//!
//! - **InMemoryStore**: document store for fixtures and tests
//! - **SegmentPromptFormatter**: default prompt formatter
//! - **GeminiClient**: hosted model over HTTP

pub mod gemini;
pub mod memory_store;
pub mod prompt_formatter;

pub use self::gemini::{GeminiClient, GeminiConfig};
pub use self::memory_store::{InMemoryStore, StoreFixture};
pub use self::prompt_formatter::{DEFAULT_INSTRUCTION, SegmentPromptFormatter};
