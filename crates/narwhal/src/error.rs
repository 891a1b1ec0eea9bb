use crate::voronoi::DiagramError;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("edge {from} -> {to} references unknown vertex {missing}")]
    MissingEndpoint {
        from: String,
        to: String,
        missing: String,
    },
    #[error("vertex id appears more than once: {id}")]
    DuplicateVertex { id: String },
    #[error("layout bounds must be finite and positive, got {width} x {height}")]
    InvalidBounds { width: f64, height: f64 },
    #[error("invalid value for {name}: {value}")]
    InvalidOption { name: &'static str, value: String },
    #[error(transparent)]
    Diagram(#[from] DiagramError),
}

pub type Result<T> = std::result::Result<T, Error>;
