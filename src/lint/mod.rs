//! The lint loop: findings in, decorations out.
//!
//! - `protocol` and `worker`: messages exchanged with the lint engine
//! - `finding`: findings and their validation against the linted text
//! - `resolver`: flat offsets to structured positions
//! - `decorations`: decoration sets and their application to a host
//! - `dispatcher`, `ledger` and `session`: when to lint and which results
//!   still apply

mod decorations;
mod dispatcher;
mod finding;
mod ledger;
mod protocol;
mod resolver;
mod session;
pub mod worker;

pub use decorations::{
    apply, decorate, DecorateOptions, Decoration, DecorationSet, OverlapPolicy, ResolvedFinding,
};
pub use dispatcher::{DispatchState, Dispatcher, TimerOutcome};
pub use finding::{Finding, Severity};
pub use ledger::{RequestLedger, RequestRecord};
pub use protocol::{
    LineColumn, LintMessage, LintRequest, LintResponse, LintResult, Loc, WorkerMessage,
    WorkerRequest,
};
pub use resolver::{
    matching_prefix, normalize, resolve, resolve_end, resolve_range, Confidence, Resolution,
    ResolvedRange, TextSource,
};
pub use session::{LintSession, SessionHandle};
pub use worker::{WorkerChannel, WorkerEndpoint};
