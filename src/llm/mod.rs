//! LLM integration for company-news.
//!
//! Lookups talk to the model through the [`LlmProvider`] trait so the worker
//! pool and tests never depend on a concrete HTTP client.
//!
//! ```ignore
//! use company_news::llm::{GenerationRequest, LlmProvider, OpenAiClient, Tool};
//!
//! let client = OpenAiClient::from_env()?;
//! let request = GenerationRequest::new("", "Latest news about Acme Corp")
//!     .with_tool(Tool::web_search());
//! let response = client.generate(request).await?;
//! println!("{}", response.output_text);
//! ```

pub mod openai;

pub use openai::{
    GenerationRequest, GenerationResponse, LlmProvider, OpenAiClient, Tool, Usage,
    DEFAULT_API_BASE, DEFAULT_MODEL, DEFAULT_REQUEST_TIMEOUT_SECS,
};
