use log::LevelFilter;
use simplelog::{ConfigBuilder, SimpleLogger};

/// Stdout logger for local runs, where nothing is shipped to Logfire
pub fn setup_simple_logger() -> anyhow::Result<()> {
    let logger_config = ConfigBuilder::new()
        .set_time_format_rfc3339()
        .add_filter_allow_str("wa_webhook_store")
        .add_filter_allow_str("ntex::web::middleware")
        .build();

    Ok(SimpleLogger::init(LevelFilter::Info, logger_config)?)
}
