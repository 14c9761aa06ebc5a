//! Classification graph description
//!
//! The graph has a single task node of type [`SUBGRAPH_TYPE_NAME`] with two
//! inputs (`IMAGE`, `NORM_RECT`) and two outputs (`CLASSIFICATION_RESULT`,
//! `IMAGE`). In live-stream mode a flow limiter is placed in front of it.

use crate::options::{convert_options, ImageClassifierOptions};
use vision_tasks_core::graph::{add_flow_limiter, Graph, GraphConfig};
use vision_tasks_core::Result;

pub const CLASSIFICATION_RESULT_STREAM_NAME: &str = "classification_result_out";
pub const CLASSIFICATION_RESULT_TAG: &str = "CLASSIFICATION_RESULT";
pub const IMAGE_IN_STREAM_NAME: &str = "image_in";
pub const IMAGE_OUT_STREAM_NAME: &str = "image_out";
pub const IMAGE_TAG: &str = "IMAGE";
pub const NORM_RECT_STREAM_NAME: &str = "norm_rect_in";
pub const NORM_RECT_TAG: &str = "NORM_RECT";
pub const SUBGRAPH_TYPE_NAME: &str = "mediapipe.tasks.vision.image_classifier.ImageClassifierGraph";

/// Build the classification graph for `options`
///
/// With `enable_flow_limiting` the graph inputs reach the task node through
/// a flow limiter whose completion signal is the classification result.
pub fn create_graph_config(
    options: &ImageClassifierOptions,
    enable_flow_limiting: bool,
) -> Result<GraphConfig> {
    let mut graph = Graph::new();
    let image_in = graph.input(IMAGE_TAG, IMAGE_IN_STREAM_NAME);
    let norm_rect_in = graph.input(NORM_RECT_TAG, NORM_RECT_STREAM_NAME);

    let task = graph.add_node(SUBGRAPH_TYPE_NAME);
    graph.set_options(task, &convert_options(options))?;

    let result = graph.node_output(task, CLASSIFICATION_RESULT_TAG, CLASSIFICATION_RESULT_STREAM_NAME);
    let image_out = graph.node_output(task, IMAGE_TAG, IMAGE_OUT_STREAM_NAME);
    graph.output(&result, CLASSIFICATION_RESULT_TAG);
    graph.output(&image_out, IMAGE_TAG);

    if enable_flow_limiting {
        add_flow_limiter(&mut graph, task, &[IMAGE_TAG, NORM_RECT_TAG], CLASSIFICATION_RESULT_TAG)?;
    } else {
        graph.connect(&image_in, task, IMAGE_TAG);
        graph.connect(&norm_rect_in, task, NORM_RECT_TAG);
    }

    Ok(graph.into_config())
}
