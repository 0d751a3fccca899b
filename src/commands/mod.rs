//! Bot commands.

mod join;
mod leave;
mod now_playing;
mod pause;
mod play;
mod queue;
mod skip;
mod stop;
mod volume;

use crate::{Data, MagpieError};

/// Convenient type alias for [poise::Command].
pub type Command = poise::Command<Data, MagpieError>;

/// Lists all the implemented commands.
pub fn list() -> Vec<Command> {
    vec![
        join::join(),
        join::move_to(),
        leave::leave(),
        leave::fix(),
        now_playing::now_playing(),
        pause::pause(),
        pause::resume(),
        pause::looping(),
        play::play(),
        queue::queue(),
        queue::shuffle(),
        queue::remove(),
        skip::skip(),
        stop::stop(),
        volume::volume(),
    ]
}
