//! Scenic replay: run a JSON script of editor messages through an
//! [`Editor`] and print the resulting scene outline and undo history.
//!
//! ```text
//! scenic-replay <script.json> [config.json]
//! ```
//!
//! A script is a JSON array of messages, e.g.
//! `[{"tool": {"switch": "box"}}, {"input": {"pointerdown": {"position": {"x": 0, "y": 0}}}}]`.
//! A failing message is logged and the replay continues with the next one.
//! Set `RUST_LOG=debug` to trace routing.

use scenic_editor::{Editor, EditorConfig, Message};
use std::error::Error;
use std::process::ExitCode;

fn main() -> ExitCode {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(script) = args.next() else {
        eprintln!("usage: scenic-replay <script.json> [config.json]");
        return ExitCode::from(2);
    };
    match run(&script, args.next().as_deref()) {
        Ok(failures) if failures > 0 => ExitCode::from(1),
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("scenic-replay: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Replay `script`, returning how many messages failed.
fn run(script: &str, config: Option<&str>) -> Result<usize, Box<dyn Error>> {
    let config = match config {
        Some(path) => EditorConfig::from_json(&std::fs::read_to_string(path)?)?,
        None => EditorConfig::default(),
    };
    let messages: Vec<Message> = serde_json::from_str(&std::fs::read_to_string(script)?)?;
    log::info!("replaying {} messages from {script}", messages.len());

    let mut editor = Editor::new(config)?;
    let mut failures = 0;
    for (index, message) in messages.into_iter().enumerate() {
        let name = message.name();
        if let Err(e) = editor.dispatch(message) {
            log::error!("message {index} ({name}) failed: {e}");
            failures += 1;
        }
    }

    let store = editor.store();
    println!("{}", store.scene().registry().outline());
    let history = serde_json::json!({
        "active_tool": editor.active().name(),
        "undo": store.history_bags()?,
        "redo_depth": store.redo_len(),
    });
    println!("{}", serde_json::to_string_pretty(&history)?);
    Ok(failures)
}
