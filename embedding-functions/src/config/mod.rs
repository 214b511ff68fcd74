pub mod function_config;
pub mod provider_settings;
pub mod secret_source;
