pub mod channel_cache;
pub mod classifier;
pub mod dedup;
pub mod fetcher;
pub mod m3u_parser;
pub mod pipeline;
pub mod query;
pub mod refresh_task;
