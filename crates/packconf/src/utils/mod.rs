pub mod eval_js_config;
pub mod load_config;
pub mod normalize_options;
pub mod validate_options;
