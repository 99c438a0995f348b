pub mod comparator;
pub mod ledger;
pub mod playhead;
pub mod summary;
pub mod types;

pub use comparator::{compare, Comparison};
pub use ledger::{Ledger, NoteState};
pub use playhead::{compensated_playhead, has_elapsed, resolve};
pub use summary::summarize;
pub use types::*;
