mod lister;
mod types;

pub use lister::RemoteLister;
pub use types::{RemoteItem, UNKNOWN_FILENAME};
