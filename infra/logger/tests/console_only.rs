use veil_logger::{ConsoleTarget, LevelFilter, Logger};

#[test]
fn stderr_console_logger_has_no_file_output() {
    let logger = Logger::builder()
        .name("veil-console-only")
        .console(ConsoleTarget::Stderr)
        .level(LevelFilter::INFO)
        .init()
        .expect("logger should initialize");

    assert!(!logger.has_file_output());
    tracing::info!(operation = "get", "console-only logger is live");
}
