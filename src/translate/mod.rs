pub mod interface;
pub mod polyglot;

pub use interface::*;
pub use polyglot::PolyglotTranslator;
