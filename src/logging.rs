use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Diagnostics go to stderr so command output on stdout stays clean
/// enough to pipe.
fn try_init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("mongo_migrate=info,mongodb=warn"));

    let is_dev = std::env::var("APP_ENV").unwrap_or_else(|_| "development".into()) == "development";
    let registry = tracing_subscriber::registry().with(env_filter);

    if is_dev {
        let fmt_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_ansi(true);
        registry.with(fmt_layer).try_init()?;
    } else {
        let json_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .with_level(true)
            .with_line_number(true)
            .with_ansi(false)
            .json();
        registry.with(json_layer).try_init()?;
    }
    tracing::debug!(
        "Logging system initialized in {} mode",
        if is_dev { "development" } else { "production" }
    );
    Ok(())
}

pub fn set_panic_hook() {
    std::panic::set_hook(Box::new(|panic_info| {
        let backtrace = std::backtrace::Backtrace::capture();
        if let Some(location) = panic_info.location() {
            tracing::error!(
                message = %panic_info,
                file = %location.file(),
                line = %location.line(),
                column = %location.column(),
                backtrace = %format!("{:?}", backtrace),
                "Application panic"
            );
        } else {
            tracing::error!(
                message = %panic_info,
                backtrace = %format!("{:?}", backtrace),
                "Application panic (unknown location)"
            );
        }
        eprintln!("PANIC: {}", panic_info);
        eprintln!("{:?}", backtrace);
    }));
}

pub fn init_logging_with_fallback() {
    if let Err(e) = try_init_logging() {
        eprintln!("Failed to initialize structured logging: {}", e);
        eprintln!("Falling back to simple stderr logging");
        let stderr_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(std::io::stderr);
        if let Err(e) = tracing_subscriber::registry()
            .with(stderr_layer)
            .try_init() {
            eprintln!("Failed to initialize fallback logging: {}", e);
        }
    }
}
