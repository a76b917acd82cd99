//! Queue RPC endpoints hosted by every worker process.

pub const ENDPOINT_BUILDER_PUSH: &str = "/queue/builder/push";
pub const ENDPOINT_BUILDER_POP: &str = "/queue/builder/pop";
pub const ENDPOINT_RUNNER_PUSH: &str = "/queue/runner/push";
pub const ENDPOINT_RUNNER_POP: &str = "/queue/runner/pop";
