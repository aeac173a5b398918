// frontend/src/update.rs
//
// Root reducer.  Pure: it only touches `AppState` and describes side effects
// as `Command`s, so everything here runs under native tests.

use crate::messages::{Command, Message};
use crate::state::AppState;

pub fn update(state: &mut AppState, msg: Message) -> Vec<Command> {
    let mut commands = Vec::new();

    // ---------------------------------------------------------------
    // Delegate to domain-specific reducers.  The first one that
    // consumes the message wins.
    // ---------------------------------------------------------------

    if crate::reducers::jobs::update(state, &msg, &mut commands) {
        return commands;
    }
    if crate::reducers::canvas::update(state, &msg, &mut commands) {
        return commands;
    }
    if crate::reducers::workflow::update(state, &msg, &mut commands) {
        return commands;
    }

    warn_log!("unhandled message: {:?}", msg);
    commands
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::network::GatewayConfig;

    #[test]
    fn every_message_reaches_a_reducer() {
        let mut state = AppState::new(GatewayConfig::default());
        let cmds = update(&mut state, Message::ResetWorkflow);
        assert!(cmds.contains(&Command::FetchDefaultWorkflow));
        let cmds = update(&mut state, Message::SubmitRequested);
        assert!(cmds.iter().any(|c| matches!(c, Command::SubmitWorkflow { .. })));
        let cmds = update(&mut state, Message::CanvasWheel { x: 0.0, y: 0.0, delta_y: 1.0 });
        assert_eq!(cmds, vec![Command::Redraw]);
    }
}
