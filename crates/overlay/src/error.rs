use layers::LayerId;
use scene::entity::EntityId;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    #[error(
        "cannot set geographic coordinates of {0}: it has no geo group; add it with add_at_coordinate() first"
    )]
    MissingGeoGroup(EntityId),

    #[error("{0} is already a geo group; place its child instead")]
    NestedGeoGroup(EntityId),

    #[error("{0} is not part of the scene")]
    UnknownEntity(EntityId),

    #[error("{0} is not registered")]
    UnknownLayer(LayerId),

    #[error("{0} is not implemented")]
    Unimplemented(&'static str),
}
