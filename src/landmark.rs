pub(crate) mod graph;
mod status;

pub use graph::{
    EdgeType, LandmarkCosts, LandmarkDefinition, LandmarkGraph, LandmarkGraphBuilder, LandmarkId,
    LandmarkNode, LandmarkSet, LandmarkStatus,
};
pub use status::{LandmarkStatusManager, StatusUpdate};
