//! 修订记录与重定向地图的持久化

pub mod state;

pub use state::{RedirectMap, RevisionId, RevisionMap, StateMap};
