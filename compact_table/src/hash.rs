//! Default hashing setup for all table types.
use std::hash::BuildHasherDefault;

use zwohash::ZwoHasher;

/// Build hasher used by every table unless a different one is supplied.
pub type DefaultBuildHasher = BuildHasherDefault<ZwoHasher>;
