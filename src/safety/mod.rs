// Safety gate
//
// Scans user messages for crisis keywords and builds the fixed safety reply.

mod detector;

pub use detector::{CrisisDetection, CrisisDetector};
