pub mod history;
pub mod lastfm;
pub mod maloja;
pub mod spotify;
pub mod transport;

pub use lastfm::{LastFmClient, LastFmConfig, TopPeriod};
pub use maloja::{MalojaClient, MalojaConfig};
pub use spotify::{SpotifyConfig, SpotifyPlaylist};
pub use transport::{HttpTransport, TransportError, Validate};
