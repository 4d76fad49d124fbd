//! Agent layer - the tool-calling surface between the LLM runtime and the
//! external services.
//!
//! The pieces, in the order a question flows through them:
//! 1. **Routing** (`runtime`) - pick the agent profile whose products the
//!    question mentions.
//! 2. **Tool surface** (`tools`) - the registry of named tools the LLM may
//!    invoke; every tool returns a plain string, never an error.
//! 3. **Query gateway** (`gateway`) - the SELECT-only, row-capped warehouse
//!    query path. This is the one contract-heavy component: policy check,
//!    truncation, and an error taxonomy the calling model can act on.
//! 4. **Calendar** (`calendar`) - thin scheduling tools over a substitutable
//!    calendar service client.
//! 5. **Model seam** (`llm`) - the chat-completions client driving the
//!    tool-call loop.
//!
//! # Safety principle
//!
//! The LLM writes SQL; it never mutates. The gateway's SELECT guard is a
//! denial-of-mutation check, not a parser - real isolation belongs to the
//! warehouse permission layer.

pub mod calendar;
pub mod gateway;
pub mod llm;
pub mod runtime;
pub mod tools;
