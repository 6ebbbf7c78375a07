// Tile-based navigation for an endless, chunk-streamed world.
// See src/engine/world.rs for the entry point.

pub mod engine;
