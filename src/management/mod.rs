mod auth;
mod player;

pub use auth::AuthController;
pub use player::CallbackId;
pub use player::DEFAULT_POLL_INTERVAL;
pub use player::SpotifyController;
pub use player::UpdateCallback;
