use crate::{
    commands,
    util::alias::Error,
    models::data::Data,
};

pub fn create_commands() -> Vec<poise::Command<Data, Error>> {
    vec![
        commands::music::join::join(),
        commands::music::leave::leave(),
        commands::music::play::play(),
        commands::music::stop::stop(),
        commands::music::pause::pause(),
        commands::music::resume::resume(),
        commands::music::skip::skip(),
        commands::music::clear::clear(),
        commands::music::volume::volume(),
        commands::music::queue::queue(),
        commands::utils::ask::ask(),
        commands::utils::analyze::analyze(),
        commands::utils::aihelp::aihelp(),
        commands::game::rps::rps(),
    ]
}
