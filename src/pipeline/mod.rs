pub mod store;
pub mod profile;
pub mod narrative;
pub mod loader; // CSV tables → RecordStore
pub mod output; // Narrative → <dir>/<encounter>/<n>/
pub mod processor; // store → profile → narrative orchestration
