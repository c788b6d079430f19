pub mod arrangement_client;
pub mod musicbrainz_client;

pub use arrangement_client::HttpArrangementClient;
pub use musicbrainz_client::MusicBrainzClient;
