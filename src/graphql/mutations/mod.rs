pub mod auth;
pub mod links;
pub mod votes;

use async_graphql::MergedObject;

pub use auth::AuthMutations;
pub use links::LinkMutations;
pub use votes::VoteMutations;

#[derive(MergedObject, Default)]
#[graphql(name = "Mutation")]
pub struct MutationRoot(LinkMutations, AuthMutations, VoteMutations);
