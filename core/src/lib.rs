//! Pieces of `mend` that do not depend on what is being fixed: a blocking client for
//! OpenAI-compatible inference servers and the declarative schemas used to constrain its replies.

pub mod llm;
pub mod schema;
pub mod test_util;
