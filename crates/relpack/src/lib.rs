pub mod banner;
pub mod bundle;
pub mod combine;
pub mod compile;
pub mod config;
pub mod git;
pub mod locator;
pub mod metadata;
pub mod minify;
pub mod pipeline;
pub mod tasks;
pub mod util;
pub mod watch;

pub use config::Config;
pub use pipeline::ReleasePipeline;
