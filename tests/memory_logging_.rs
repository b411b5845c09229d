/// Routes `tracing` output through the test harness, so it only shows for failing tests.
pub fn init() {
	let _ = tracing_subscriber::fmt().with_test_writer().with_max_level(tracing::Level::TRACE).try_init();
}
