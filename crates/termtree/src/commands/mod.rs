pub mod fuzzy;
pub mod index;
pub mod search;
pub mod stats;
pub mod suggest;
pub mod version;
