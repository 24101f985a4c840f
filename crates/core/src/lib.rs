pub mod cache;
pub mod config;
pub mod covers;
pub mod encoding;
pub mod error;
pub mod fetch;
pub mod identify;
pub mod lang;
pub mod listing;
pub mod merge;
pub mod parse;
pub mod preprocess;
pub mod publication;
pub mod query;
pub mod record;
pub mod series;
pub mod site;
pub mod text;
pub mod title;

pub use cache::Caches;
pub use config::{SearchConfig, SearchConfigBuilder, SearchOperator, SeriesIndexPolicy};
pub use covers::{fetch_title_covers, parse_cover_gallery};
pub use error::{Error, Result};
pub use fetch::{FetchConfig, Fetcher, Page};
pub use identify::{Client, IdentifyRequest};
#[doc(hidden)]
pub use listing::{SimpleSearchFilter, advanced_search_refused};
pub use merge::merge;
pub use parse::Document;
#[doc(hidden)]
pub use preprocess::strip_tooltips;
pub use publication::{SeriesResolver, parse_publication};
pub use record::{
    BookRecord, ID_CATALOG, ID_PUBLICATION, ID_TITLE, PublicationRecord, Relevance, SearchStub,
    SeriesInfo, TitleRecord,
};
pub use series::{SeriesPage, parse_series_page};
pub use site::{DEFAULT_BASE_URL, Site};
pub use title::parse_title;
