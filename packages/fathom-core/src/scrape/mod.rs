//! CLI/API output scraping.
//!
//! One scraper per device family, each producing the same normalized
//! record types regardless of whether the source was positional text,
//! JSON or XML. Format detection is isolated to a single decode step per
//! command; an output shape the parser does not recognize degrades to an
//! empty result rather than an error.

mod panos;
mod patterns;
mod switch;

pub use panos::PanosScraper;
pub use switch::SwitchScraper;
