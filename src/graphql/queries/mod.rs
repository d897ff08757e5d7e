pub mod feed;
pub mod links;

use async_graphql::MergedObject;

pub use feed::FeedQueries;
pub use links::LinkQueries;

#[derive(MergedObject, Default)]
#[graphql(name = "Query")]
pub struct QueryRoot(FeedQueries, LinkQueries);
