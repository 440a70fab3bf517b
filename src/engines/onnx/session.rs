use std::path::{Path, PathBuf};

use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

#[derive(thiserror::Error, Debug)]
pub enum OnnxError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error("Model file not found at {}", .0.display())]
    ModelNotFound(PathBuf),
    #[error("Invalid symbol table: {0}")]
    Config(String),
    #[error("Unexpected model output: {0}")]
    Output(String),
    #[error("Session lock poisoned by an earlier panic")]
    Poisoned,
}

/// A model output copied out of the session, widened to f32.
#[derive(Debug, Clone)]
pub(crate) struct OutputTensor {
    pub name: String,
    pub shape: Vec<usize>,
    pub data: Vec<f32>,
}

/// First output whose name is in `names`, else the output at `position`.
pub(crate) fn pick_output<'a>(
    outputs: &'a [OutputTensor],
    names: &[&str],
    position: usize,
) -> Option<&'a OutputTensor> {
    outputs
        .iter()
        .find(|t| names.contains(&t.name.as_str()))
        .or_else(|| outputs.get(position))
}

/// Open an ONNX graph on the CPU provider.
///
/// With `cache_dir` set, the Level3-optimized graph is written to
/// `<cache_dir>/<stem>.optimized.onnx` on first load and read back with
/// optimization disabled afterwards.
pub(crate) fn init_session(
    onnx_path: &Path,
    num_threads: Option<usize>,
    cache_dir: Option<&Path>,
) -> Result<Session, OnnxError> {
    if !onnx_path.exists() {
        return Err(OnnxError::ModelNotFound(onnx_path.to_path_buf()));
    }

    let cached = cache_dir.map(|dir| optimized_graph_path(dir, onnx_path));
    let mut builder = Session::builder()?
        .with_execution_providers([CPUExecutionProvider::default().build()])?;

    let load_path = match cached.as_deref() {
        Some(cache) if cache.exists() => {
            log::info!("Loading pre-optimized graph from {}", cache.display());
            builder = builder.with_optimization_level(GraphOptimizationLevel::Disable)?;
            cache
        }
        Some(cache) => {
            log::info!(
                "First load of {}: optimizing and saving graph to {}",
                onnx_path.display(),
                cache.display()
            );
            if let Some(dir) = cache.parent() {
                std::fs::create_dir_all(dir)?;
            }
            builder = builder
                .with_optimization_level(GraphOptimizationLevel::Level3)?
                .with_optimized_model_path(cache)?;
            onnx_path
        }
        None => {
            builder = builder.with_optimization_level(GraphOptimizationLevel::Level3)?;
            onnx_path
        }
    };

    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    Ok(builder.commit_from_file(load_path)?)
}

fn optimized_graph_path(cache_dir: &Path, onnx_path: &Path) -> PathBuf {
    let stem = onnx_path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("model");
    cache_dir.join(format!("{stem}.optimized.onnx"))
}

/// Names of all graph inputs.
pub(crate) fn input_names(session: &Session) -> Vec<String> {
    session
        .inputs()
        .iter()
        .map(|input| input.name().to_string())
        .collect()
}

/// First of `preferred` the graph declares, else its first input.
pub(crate) fn detect_input(names: &[String], preferred: &[&str]) -> Option<String> {
    preferred
        .iter()
        .find(|p| names.iter().any(|n| n == *p))
        .map(|p| p.to_string())
        .or_else(|| names.first().cloned())
}
