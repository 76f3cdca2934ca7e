pub mod bet_slip;
pub mod event_source;
pub mod insight;
pub mod match_filter;
pub mod refresh;
pub mod title_resolver;

pub use bet_slip::*;
pub use event_source::*;
pub use insight::*;
pub use match_filter::*;
pub use refresh::*;
pub use title_resolver::*;
