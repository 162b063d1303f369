mod import;

pub use import::{cmd_import_ingredients, cmd_import_tags};
