use tracing_subscriber::EnvFilter;

const CRATE_NAMES: &[&str] = &["linkbench", "linkbench_engine", "linkbench_types"];

/// Initialize the logger for testing.
///
/// Logs go to the output captured by the Rust test runner. Only the linkbench crates log at all
/// levels, everything else is limited to errors.
///
/// # Example
///
/// ```
/// linkbench_test::tracing::init();
/// ```
pub fn init() {
    let mut env_filter = EnvFilter::new("ERROR");

    for name in CRATE_NAMES {
        if let Ok(directive) = format!("{name}=TRACE").parse() {
            env_filter = env_filter.add_directive(directive);
        }
    }

    tracing_subscriber::fmt::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_test_writer()
        .compact()
        .try_init()
        .ok();
}
