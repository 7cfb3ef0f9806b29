//! Prompt text sent to the OCR model.
//!
//! DeepSeek-OCR is steered by short control directives rather than prose
//! instructions. `<|FREE|>OCR.` asks for free-form extraction: the model
//! returns the text it reads in natural reading order without forcing a
//! grounding or markdown layout.

/// Instruction sent as the text part of every OCR request.
pub const FREE_OCR_PROMPT: &str = "<|FREE|>OCR.";
