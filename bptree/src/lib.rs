// Components:
//  - tree: in-memory B+Tree over a node arena
//  - store: label-addressed objects in one file (allocator, byte
//    converter, metadata region, object cache)
//  - persistence: a tree as a graph of stored objects
//
// Saving a tree:
// 1. Each node is converted (keys and values through `TypeConverter`)
// 2. Nodes are written bottom-up, each under a fresh label
// 3. The tree header is written under the root label
// 4. Labels only the previous header reached are released

#![cfg_attr(
    test,
    allow(
        clippy::disallowed_methods,
        clippy::expect_used,
        clippy::unwrap_used
    )
)]

pub mod config;
pub mod persistence;
pub mod store;
pub mod tree;

#[cfg(test)]
mod simulation;
#[cfg(test)]
mod testing;

pub use config::{ConfigError, IndexConfig};
pub use persistence::{PersistError, TypeConverter};
pub use store::{FileStore, StoreError};
pub use tree::{Btree, SharedTree, TreeError};
