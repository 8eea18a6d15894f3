use super::XmlWrite;
use crate::errors::Result;

/// A writer call recorded by [`AutoDetectWriter`](super::AutoDetectWriter)
/// before the output method is known.
///
/// Only calls which can precede the root element without deciding the output
/// method are recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BufferedEvent {
    /// [`XmlWrite::write_start_document`]
    StartDocument(Option<bool>),
    /// [`XmlWrite::write_doc_type`]
    DocType {
        /// Name of the root element
        name: String,
        /// Public identifier
        public_id: Option<String>,
        /// System identifier
        system_id: Option<String>,
        /// Internal subset
        subset: Option<String>,
    },
    /// [`XmlWrite::write_comment`]
    Comment(String),
    /// [`XmlWrite::write_processing_instruction`]
    ProcessingInstruction {
        /// Target of the instruction
        name: String,
        /// Content of the instruction
        text: String,
    },
    /// [`XmlWrite::write_whitespace`], or [`XmlWrite::write_string`] with
    /// whitespace-only text
    Whitespace(String),
}

impl BufferedEvent {
    /// Repeats the recorded call on `writer`.
    pub fn replay<W: XmlWrite + ?Sized>(&self, writer: &mut W) -> Result<()> {
        match self {
            Self::StartDocument(standalone) => writer.write_start_document(*standalone),
            Self::DocType {
                name,
                public_id,
                system_id,
                subset,
            } => writer.write_doc_type(
                name,
                public_id.as_deref(),
                system_id.as_deref(),
                subset.as_deref(),
            ),
            Self::Comment(text) => writer.write_comment(text),
            Self::ProcessingInstruction { name, text } => {
                writer.write_processing_instruction(name, text)
            }
            Self::Whitespace(text) => writer.write_whitespace(text),
        }
    }
}
