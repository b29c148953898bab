//! Choosing and fetching one photo per run.

mod orchestrator;
mod selector;
mod types;

pub use orchestrator::Orchestrator;
pub use selector::{choose_candidate, filter_candidates, is_already_fetched, target_path};
pub use types::{Candidate, PickOutcome, PickState};
