//! Export of trained networks for serving.
//!
//! A serving directory holds the network record, its configuration and a
//! signature naming the fixed input and output tensors.

mod serving;

pub use serving::{export_for_serving, load_serving_model, ServingSignature, SIGNATURE_FILE};
