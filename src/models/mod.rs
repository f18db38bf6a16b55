pub mod document;
pub mod pinned;
pub mod segment;
pub mod tolerance;
pub mod verification;

pub use document::{DocumentContent, Encoding, RewriteRequest};
pub use pinned::{extract_marked_spans, normalize_whitespace, pinned_texts};
pub use segment::{Document, Segment};
pub use tolerance::{RetryPolicy, ToleranceState};
pub use verification::{FailureReason, VerificationResult};
