mod settings;

pub use settings::{SearchSettings, Settings};
