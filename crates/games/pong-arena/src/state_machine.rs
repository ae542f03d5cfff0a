use pong_core::net::actions::GameMode;

/// Mode change driven purely by goal occupancy. Completion is decided by
/// scoring, not here.
///
/// `stopped → playing` is never produced directly: a game always passes
/// through `starting` for one evaluation so goals and balls are reset.
pub fn next_mode(mode: GameMode, occupied: usize) -> Option<GameMode> {
    match (mode, occupied) {
        (GameMode::Stopped, 0) => None,
        (GameMode::Stopped, _) => Some(GameMode::Starting),
        (GameMode::Starting | GameMode::Playing | GameMode::Completed, 0) => {
            Some(GameMode::Stopped)
        },
        (GameMode::Starting, _) => Some(GameMode::Playing),
        (GameMode::Playing | GameMode::Completed, _) => None,
    }
}
