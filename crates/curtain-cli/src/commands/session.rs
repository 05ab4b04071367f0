use clap::Subcommand;
use serde_json::json;

use curtain_core::storage::Database;

#[derive(Subcommand)]
pub enum SessionAction {
    /// Clear the session scope, as closing the browser tab would
    End,
}

pub fn run(action: SessionAction) -> curtain_core::Result<()> {
    let db = Database::open()?;
    match action {
        SessionAction::End => {
            let cleared = db.end_session()?;
            println!("{}", json!({ "type": "session_ended", "cleared": cleared }));
        }
    }
    Ok(())
}
