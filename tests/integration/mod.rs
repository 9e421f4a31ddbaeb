//! Integration tests for the treecache overlay, cached base and prefetch protocol

mod end_to_end;
mod overlay_precedence;
mod prefetch_budget;
mod sled_override_store;
