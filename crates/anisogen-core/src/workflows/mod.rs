//! # Workflows Module
//!
//! Top-level entry points that sequence the engine's stages into complete
//! runs.
//!
//! - **Search** ([`search`]) - The generational driver: corpus lookup, then
//!   mutate, assemble, evaluate and select until the target ZFS is reached or
//!   the generation budget runs out.
//! - **Lookup** ([`lookup`]) - Direct-hit retrieval from the corpus only.
//! - **Index** ([`index`]) - Builds and writes the donor-mode index.

pub mod index;
pub mod lookup;
pub mod search;
