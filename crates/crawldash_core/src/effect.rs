use crate::{FetchRequest, Mutation, MutationId, QueryKey, RequestId};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Run the query for `key` and answer with `Msg::QueryLoaded`.
    Fetch { request_id: RequestId, key: QueryKey },
    /// Send the mutation and answer with `Msg::MutationSettled`.
    Mutate {
        mutation_id: MutationId,
        mutation: Mutation,
    },
}

impl From<FetchRequest> for Effect {
    fn from(request: FetchRequest) -> Self {
        Effect::Fetch {
            request_id: request.request_id,
            key: request.key,
        }
    }
}
