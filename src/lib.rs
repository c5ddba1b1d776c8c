pub mod config;
pub mod extract;
pub mod history;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod store;
