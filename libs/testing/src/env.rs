//! Process environment wiring between the harness and the service.

use crate::compose::Container;

/// Container port Postgres listens on.
pub const POSTGRES_PORT: &str = "5432";

/// Point `DB_HOST`/`DB_PORT` at a compose-started Postgres.
///
/// Returns the host port, or `None` (leaving the environment untouched) when
/// the container publishes no 5432 mapping. Call during setup, before the
/// service or any other environment reader is started.
pub fn database_env(postgres: &Container) -> Option<String> {
    let port = postgres.host_port(POSTGRES_PORT)?.to_string();
    std::env::set_var("DB_HOST", "localhost");
    std::env::set_var("DB_PORT", &port);
    Some(port)
}
