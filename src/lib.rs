pub mod classifier;
pub mod config;
pub mod drafter;
pub mod extractor;
pub mod materializer;
pub mod patterns;
pub mod resolver;
pub mod runner;
pub mod storage;
pub mod walker;

pub use classifier::InquiryClassifier;
pub use config::Config;
pub use drafter::{draft_email, DraftEmail};
pub use extractor::Extractor;
pub use materializer::{PdfCapability, TextMaterializer};
pub use patterns::PatternLibrary;
pub use resolver::{InvoiceRecord, InvoiceTable, RecordResolver, SupabaseTable};
pub use runner::{FileOutcome, FileReport, RunLogEntry, Runner};
pub use storage::{ObjectStore, StorageEntry, SupabaseStorage};
pub use walker::{TreeWalker, WalkTrace};
