/// Logger setup shared by the binary and the tests. Safe to call more than
/// once; later calls are no-ops.
pub fn init_log() {
  let env = env_logger::Env::default().default_filter_or("info");
  let _ = env_logger::Builder::from_env(env)
    .format_timestamp(None)
    .try_init();
}
