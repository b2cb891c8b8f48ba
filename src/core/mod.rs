pub mod conflict;
pub mod engine;
pub mod filter;
pub mod fingerprint;
pub mod layout;
pub mod manifest;
pub mod pipeline;
pub mod scanner;

pub use conflict::CollisionResolver;
pub use engine::{EngineConfig, TransferEngine, TransferProgress};
pub use filter::ExtensionSet;
pub use fingerprint::{prefix_hash, ContentFingerprint, DedupPolicy, DuplicateDetector};
pub use layout::{human_size, latest_run_dir, new_run_dir, StickLayout};
pub use manifest::{
    DuplicateReason, Manifest, TransferOutcome, TransferRecord, TransferSummary, MANIFEST_FILE_NAME,
};
pub use pipeline::{transfer, upload, Pipeline, ScanEstimate, SourceSpec};
pub use scanner::{FileCandidate, FileScanner, ScanConfig};
