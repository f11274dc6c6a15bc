pub mod paragraphs;
pub mod reconciler;

pub use paragraphs::assemble_paragraphs;
pub use reconciler::{TranscriptReconciler, TranscriptSegment};
