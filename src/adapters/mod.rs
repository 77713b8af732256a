pub mod creator_directory;
pub mod postgres;
pub mod sports_data;

pub use creator_directory::{CreatorDirectory, CreatorProfile, StaticCreatorDirectory};
pub use postgres::PostgresStore;
pub use sports_data::{HttpSportsData, ResolvedOutcome, SportsDataProvider};
