//! Bidirectional, field-level sync between an internal system and one
//! integration at a time.
//!
//! # Architecture
//!
//! Both sides are reached only through the [`DataExchange`] trait. Everything
//! between the two exchange calls is pure computation over typed values.
//!
//! ## Components
//!
//! - **Request / Report**: what each side is asked for and what it answers
//! - **Mapper**: translates reported objects into the other side's entities,
//!   fields and value kinds
//! - **Judge**: picks a winner per field when both sides changed it
//! - **Correlator**: finds an object's identifier on the other side
//! - **Order**: the create/update instructions for one side
//! - **Process / Service**: runs a sync and delivers its orders
//!
//! ## Sync Process
//!
//! 1. **Request**: build one request per side from the mapping manual
//! 2. **Fetch**: get both change reports concurrently
//! 3. **Map**: translate every object, recording what was skipped
//! 4. **Judge**: pair objects reported by both sides, decide each field
//! 5. **Deliver**: send each side its order
//!
//! # Example
//!
//! ```
//! use fieldsync_model::{FieldMapping, MappingManual};
//! use fieldsync_sync::{SyncProcess, SyncConfig};
//! use std::sync::Arc;
//!
//! let manual = MappingManual::new(
//!     "crm",
//!     vec![FieldMapping::new("person", "email", "Contact", "Email")],
//! )
//! .unwrap();
//!
//! let process = SyncProcess::with_defaults(Arc::new(manual));
//! assert_eq!(process.config(), &SyncConfig::default());
//! ```

mod correlate;
mod diagnostics;
mod error;
pub mod exchange;
mod judge;
pub mod mapper;
mod order;
mod process;
mod report;
mod request;
mod service;

pub use correlate::{CorrelationMap, Correlator, FnCorrelator, NoCorrelation, correlate_with};
pub use diagnostics::{Diagnostic, DiagnosticKind};
pub use error::{ExchangeError, SyncError, SyncResult};
pub use exchange::DataExchange;
pub use judge::{
    AuthoritativeSideJudge, FieldCandidate, LatestChangeJudge, SyncJudge, Verdict, Winner,
};
pub use mapper::{MappedField, MappedObject, ObjectMapper};
pub use order::SyncOrder;
pub use process::{SyncConfig, SyncOutcome, SyncProcess};
pub use report::{ChangeReport, FieldChange, ObjectChange};
pub use request::{RequestDao, RequestObject};
pub use service::{RunResult, SyncService};
