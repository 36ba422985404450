use std::time::Duration;

use crate::engine::{with_deadline, Engine, EngineError};

const PING_DEADLINE: Duration = Duration::from_secs(5);

pub fn print_banner(version: &str) {
    let ascii_art = format!(
        r#"
      __                __                  __
     / /_  ____ ______/ /_  ____  _________/ /
    / __ \/ __ `/ ___/ __ \/ __ \/ ___/ __  /
   / / / / /_/ / /  / /_/ / /_/ / /  / /_/ /
  /_/ /_/\__,_/_/  /_.___/\____/_/   \__,_/

Harbor Daemon v{}
"#,
        version
    );

    println!("{}", ascii_art);
}

/// Verify the engine answers before anything else starts.
/// There is no point serving a dashboard for an engine we cannot reach.
pub async fn check_engine(engine: &dyn Engine) -> Result<(), EngineError> {
    match with_deadline("ping", PING_DEADLINE, engine.ping()).await {
        Ok(()) => {
            tracing::info!("Connected to container engine");
            Ok(())
        }
        Err(EngineError::Timeout { .. }) => Err(EngineError::Unreachable(format!(
            "ping timeout after {} seconds",
            PING_DEADLINE.as_secs()
        ))),
        Err(e) => Err(e),
    }
}
