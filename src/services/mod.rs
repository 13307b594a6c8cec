pub mod analytics_service;
pub mod export_service;
pub mod log_service;
pub mod model_service;
pub mod playground_service;
pub mod pricing;
pub mod prompt_service;
pub mod provider_service;
pub mod template_service;
