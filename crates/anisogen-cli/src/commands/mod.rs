pub mod index;
pub mod lookup;
pub mod search;
