pub mod civic_map;
pub mod config;
pub mod dataset;
pub mod legend;
pub mod map;
pub mod record_source;
pub mod records;
pub mod search;
pub mod sidebar;

pub use civic_map::{CivicMap, MapClick, MapMount, SearchMode, ViewState};
