//! SOAP note generation: prompt construction, bounded generate/parse/repair
//! loop, and a post-hoc grounding check on the finished note.

pub mod generator;
pub mod grounding;
pub mod parser;
pub mod prompt;
pub mod types;

pub use generator::SoapNoteGenerator;
pub use grounding::ungrounded_terms;
pub use parser::{parse_soap_response, sanitize_generation_output};
pub use prompt::{build_soap_prompt, repair_instruction, SoapPrompt, SOAP_SYSTEM_PROMPT};
pub use types::{GenerationError, GenerationReport, SoapNote, SoapParseError, SoapSection};
