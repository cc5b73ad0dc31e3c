//! Error types shared across the crate.

use crate::graph::FrameId;
use thiserror::Error;

/// Failures of the scene graph store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GraphError {
    #[error("frame \"{0}\" does not exist")]
    UnknownFrame(FrameId),

    #[error("frame \"{0}\" already exists")]
    DuplicateFrame(FrameId),

    #[error("frame \"{child}\" already has parent \"{parent}\"")]
    AlreadyParented { child: FrameId, parent: FrameId },

    #[error("edge from \"{0}\" to itself")]
    SelfLoop(FrameId),
}

/// Failures while attaching one plugin entry to a frame.
///
/// All variants are terminal for the entry that produced them. None of them
/// escape to the graph event source; they are logged and collected in an
/// [`AttachReport`](crate::AttachReport).
#[derive(Error, Debug)]
pub enum AttachError {
    /// `plugins` exists but is not a list.
    #[error("\"{key}\" of frame \"{frame}\" is not a list")]
    MalformedPlugins { key: String, frame: FrameId },

    /// A plugin entry has no (string) library name.
    #[error("no \"{key}\" given in plugins section of \"{frame}\"")]
    MissingLibName { key: String, frame: FrameId },

    /// Neither a fresh instance nor a load attempt produced the library.
    #[error("unable to load plugin library \"{library}\"")]
    LibraryNotFound { library: String },

    /// The library instance does not provide the item plugin contract.
    #[error("library \"{library}\" does not provide an item plugin")]
    NotAnItemPlugin { library: String },

    /// The graph refused the target frame or the finished item. `library`
    /// is set once the plugin had been resolved.
    #[error("graph rejected item plugin: {source}")]
    Graph {
        library: Option<String>,
        #[source]
        source: GraphError,
    },
}

impl From<GraphError> for AttachError {
    fn from(source: GraphError) -> Self {
        Self::Graph {
            library: None,
            source,
        }
    }
}

impl AttachError {
    /// Name of the library involved, when the failure got that far.
    pub fn library(&self) -> Option<&str> {
        match self {
            Self::LibraryNotFound { library } | Self::NotAnItemPlugin { library } => {
                Some(library.as_str())
            }
            Self::Graph { library, .. } => library.as_deref(),
            _ => None,
        }
    }
}

/// Failures while reading configuration documents.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to parse YAML configuration: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("configuration root is not a map")]
    NotAMap,
}
